mod article;
mod blog;
mod scan;

pub use article::{Article, CandidateArticle, NewArticle};
pub use blog::{Blog, NewBlog};
pub use scan::{ScanError, ScanResult, ScanSource};
