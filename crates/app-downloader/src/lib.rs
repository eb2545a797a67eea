//! yt-dlp driven downloads into the video library.

#[macro_use(defer)]
extern crate scopeguard;

mod common;
pub mod episode;
pub mod links;
pub mod playlist;
pub mod thumbnail;
pub mod yt_dlp;

pub use common::DownloadReport;
