pub mod archive;
pub mod records;

pub use archive::{compress, create_zip_file, create_zip_loop, InputFile};
pub use records::{CentralDirectoryHeader, DosDateTime, EndOfCentralDirectory, LocalFileHeader};
