pub mod errors;
pub mod token;

pub use errors::InvitationError;
pub use token::InvitationToken;
pub use token::InvitationTokenHasher;
pub use token::TokenHash;
