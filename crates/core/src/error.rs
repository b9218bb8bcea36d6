use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenameError {
    #[error("ファイルが存在しません: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("リネームに失敗しました: {} -> {}: {source}", .from.display(), .to.display())]
    RenameFailure {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("フォルダを読めませんでした: {}: {source}", .path.display())]
    DirectoryAccess {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("取り消しログが不正です: {}: {reason}", .path.display())]
    UndoReplay { path: PathBuf, reason: String },

    #[error("取り消しログを開けませんでした: {}: {source}", .path.display())]
    LogOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("取り消しログ書き込みに失敗しました: {}: {source}", .path.display())]
    LogWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("日付書式を適用できませんでした: {0}")]
    DateFormat(String),
}

pub type Result<T> = std::result::Result<T, RenameError>;
