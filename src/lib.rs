pub mod config;
pub mod observer;
pub mod server;
pub mod session;

pub mod prelude {
    pub use codec::{frame::*, handshake, *};

    pub use super::observer::*;
    pub use super::session::{Session, SessionError, State};
}

use std::sync::Arc;

use self::{config::Config, observer::Observer};

/// In order to let the integration test directly use the ws-server crate and
/// start the server, a function is opened to replace the main function to
/// directly start the server.
pub async fn start_server<T>(config: Arc<Config>, observer: T) -> anyhow::Result<()>
where
    T: Observer + 'static,
{
    server::run(config, Arc::new(observer)).await
}
