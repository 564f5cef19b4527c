pub mod autocommit_cmd;
pub mod init;
pub mod loop_cmd;
pub mod pause;
pub mod resume;
pub mod status;
