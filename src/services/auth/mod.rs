pub mod authenticator;
pub mod clock;
pub mod credentials;
pub mod factory;
pub mod principal;
pub mod token;

pub use authenticator::{AuthOutcome, RequestAuthenticator};
pub use credentials::{CredentialVerifier, RepoCredentialVerifier};
pub use factory::{build_authenticator, build_token_service};
pub use principal::{Principal, PrincipalLoader, RepoPrincipalLoader};
pub use token::{TokenError, TokenService};
