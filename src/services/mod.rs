mod blogs;
mod scanner;

pub use blogs::BlogService;
pub use scanner::Scanner;
