pub mod challenge;
pub mod profile;

pub use challenge::Challenge;
pub use profile::Profile;
