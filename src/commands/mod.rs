//! Subcommand implementations. Each function takes whatever `cli::Cli`
//! values it needs explicitly; none of them read global or ambient state.

mod add_dep;
mod foreach;
mod init;
mod restore;
mod status;
mod update;
mod update_dep;

pub use add_dep::run as add_dep;
pub use foreach::run as foreach;
pub use init::run as init;
pub use restore::run as restore;
pub use status::run as status;
pub use update::run as update;
pub use update_dep::run as update_dep;
