//! DockFlow のイメージビルド機能
//!
//! コンテナエンジン (docker / podman) やレジストリCLIを外部プロセスとして起動し、
//! アーキテクチャ別のイメージビルドとレジストリへのプッシュを行います。

pub mod args;
pub mod builder;
pub mod error;
pub mod naming;
pub mod process;
pub mod pusher;
pub mod target;

#[cfg(test)]
mod testing;

pub use args::{ArgValue, ChannelArgs};
pub use builder::ImageBuilder;
pub use error::{BuildError, ProcessError};
pub use naming::{ReleaseChannel, channel_image_names, image_name, split_image_tag, validate_tag};
pub use process::{CommandRunner, DryRunRunner, IoPolicy, ProcessInvocation, ProcessRunner};
pub use pusher::ImagePusher;
pub use target::{BuildTarget, zip_targets};
