pub mod multipart;

pub use multipart::{collect_files, MultipartLimits, UploadedFile};
