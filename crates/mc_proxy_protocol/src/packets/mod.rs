pub mod config;
pub mod handshake;
pub mod login;
pub mod play;
pub mod registry;
pub mod status;

pub use config::{FinishConfigurationC2s, FinishConfigurationS2c};
pub use handshake::{HandshakeC2s, NextState};
pub use login::{
    LoginAcknowledgedC2s, LoginCompressionS2c, LoginDisconnectS2c, LoginHelloC2s, LoginHelloS2c,
    LoginKeyC2s, LoginQueryRequestS2c, LoginQueryResponseC2s, LoginSuccessS2c,
};
pub use play::{DisconnectS2c, JoinGameS2c, KeepAlive, RespawnS2c};
pub use status::{PingC2s, PongS2c, StatusRequestC2s, StatusResponseS2c};
