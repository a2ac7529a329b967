pub mod downloader;
pub mod matcher;
pub mod pipeline;
pub mod process;
pub mod renamer;
pub mod tagger;
pub mod transcoder;
