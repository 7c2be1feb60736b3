pub mod destroy;
pub mod graph;
pub mod init;
pub mod outputs;
pub mod preview;
pub mod render;
pub mod up;
pub mod validate;
