// Shared library untuk Direct Messaging workspace
pub mod models {
    pub mod claims;
}

pub mod utils {
    pub mod cloudinary;
    pub mod jwt;
}
