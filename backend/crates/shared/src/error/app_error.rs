//! Application Error - Unified error type for the client core
//!
//! Defines [`AppError`] struct and [`AppResult<T>`] type alias.

use std::borrow::Cow;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

use super::kind::ErrorKind;

/// アプリケーション統一エラー型
///
/// リクエスト重複排除・トークン更新・楽観的更新・ログイン保護で共通に
/// 使用する標準エラー型です。一つの決着を複数の購読者へ配るため、
/// `Clone` は安価（元のエラーは `Arc` で共有）です。
///
/// ## Fields
/// * `kind` - エラーの分類
/// * `message` - ユーザー向けのエラーメッセージ
/// * `action` - ユーザーが取るべきアクション（オプション）
/// * `status` - HTTP ステータスコード（レスポンス由来の場合）
/// * `source` - 元のエラー（オプション、デバッグ用）
///
/// ## Examples
/// ```rust
/// use kernel::error::{app_error::AppError, kind::ErrorKind};
///
/// // シンプルなエラー
/// let err = AppError::new(ErrorKind::Transport, "Connection reset");
///
/// // 詳細なエラー
/// let err = AppError::auth_rejected("Session could not be refreshed")
///     .with_action("Please sign in again");
/// ```
#[derive(Clone)]
pub struct AppError {
    /// エラー種別
    kind: ErrorKind,
    /// ユーザー向けメッセージ
    message: Cow<'static, str>,
    /// ユーザーが取るべきアクション
    action: Option<Cow<'static, str>>,
    /// HTTP ステータスコード
    status: Option<u16>,
    /// 元のエラー（デバッグ用）
    source: Option<Arc<dyn Error + Send + Sync + 'static>>,
}

/// アプリケーション結果型エイリアス
///
/// `Result<T, AppError>` の省略形です。
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    // ========================================================================
    // Constructors
    // ========================================================================

    /// 新しいエラーを作成
    ///
    /// ## Arguments
    /// * `kind` - エラー種別
    /// * `message` - ユーザー向けメッセージ
    #[inline]
    pub fn new(kind: ErrorKind, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind,
            message: message.into(),
            action: None,
            status: None,
            source: None,
        }
    }

    // ========================================================================
    // Convenience constructors
    // ========================================================================

    /// 通信エラー
    #[inline]
    pub fn transport(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Transport, message)
    }

    /// 認証期限切れエラー
    #[inline]
    pub fn auth_expired(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::AuthExpired, message)
    }

    /// 認証拒否エラー（再ログインが必要）
    #[inline]
    pub fn auth_rejected(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::AuthRejected, message).with_action("Please sign in again")
    }

    /// 入力検証エラー
    #[inline]
    pub fn validation(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// キャンセル
    #[inline]
    pub fn cancelled(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Cancelled, message)
    }

    /// 非成功 HTTP ステータス
    #[inline]
    pub fn http(status: u16, message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Http, message).with_status(status)
    }

    /// ストレージエラー
    #[inline]
    pub fn storage(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Storage, message)
    }

    /// 内部エラー
    #[inline]
    pub fn internal(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    // ========================================================================
    // Builder methods
    // ========================================================================

    /// ユーザー向けアクションを設定
    #[inline]
    pub fn with_action(mut self, action: impl Into<Cow<'static, str>>) -> Self {
        self.action = Some(action.into());
        self
    }

    /// HTTP ステータスコードを設定
    #[inline]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// 元のエラーを設定（デバッグ用）
    ///
    /// ## Examples
    /// ```rust
    /// use kernel::error::app_error::{AppError, AppResult};
    ///
    /// fn read_store() -> AppResult<String> {
    ///     std::fs::read_to_string("security.json")
    ///         .map_err(|e| AppError::storage("Failed to read store").with_source(e))
    /// }
    /// ```
    #[inline]
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        self.source = Some(Arc::new(source));
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// エラー種別を取得
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// HTTP ステータスコードを取得
    #[inline]
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// メッセージを取得
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// アクションを取得
    #[inline]
    pub fn action(&self) -> Option<&str> {
        self.action.as_deref()
    }

    /// キャンセルかどうか
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.kind.is_cancellation()
    }

    /// 再ログインが必要かどうか
    #[inline]
    pub fn requires_reauthentication(&self) -> bool {
        self.kind.requires_reauthentication()
    }
}

impl fmt::Debug for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut builder = f.debug_struct("AppError");
        builder.field("kind", &self.kind);
        builder.field("message", &self.message);
        if let Some(status) = self.status {
            builder.field("status", &status);
        }
        if let Some(action) = &self.action {
            builder.field("action", action);
        }
        if let Some(source) = &self.source {
            builder.field("source", source);
        }
        builder.finish()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)?;
        if let Some(status) = self.status {
            write!(f, " (Status: {})", status)?;
        }
        if let Some(action) = &self.action {
            write!(f, " (Action: {})", action)?;
        }
        Ok(())
    }
}

impl Error for AppError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn Error + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_error() {
        let err = AppError::new(ErrorKind::Transport, "Connection reset");
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert_eq!(err.message(), "Connection reset");
        assert!(err.action().is_none());
        assert!(err.status().is_none());
    }

    #[test]
    fn test_convenience_constructors() {
        assert_eq!(AppError::transport("t").kind(), ErrorKind::Transport);
        assert_eq!(AppError::auth_expired("t").kind(), ErrorKind::AuthExpired);
        assert_eq!(AppError::auth_rejected("t").kind(), ErrorKind::AuthRejected);
        assert_eq!(AppError::validation("t").kind(), ErrorKind::Validation);
        assert_eq!(AppError::cancelled("t").kind(), ErrorKind::Cancelled);
        assert_eq!(AppError::storage("t").kind(), ErrorKind::Storage);
        assert_eq!(AppError::internal("t").kind(), ErrorKind::Internal);

        let err = AppError::http(404, "Not found");
        assert_eq!(err.kind(), ErrorKind::Http);
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn test_auth_rejected_carries_action() {
        let err = AppError::auth_rejected("Refresh failed");
        assert!(err.requires_reauthentication());
        assert_eq!(err.action(), Some("Please sign in again"));
    }

    #[test]
    fn test_clone_shares_source() {
        let io_err = std::io::Error::new(std::io::ErrorKind::TimedOut, "timed out");
        let err = AppError::transport("Request timed out").with_source(io_err);
        let cloned = err.clone();

        assert!(cloned.source().is_some());
        assert_eq!(cloned.message(), err.message());
        assert_eq!(cloned.kind(), err.kind());
    }

    #[test]
    fn test_display() {
        let err = AppError::cancelled("Request cancelled");
        assert_eq!(err.to_string(), "[Cancelled] Request cancelled");

        let err = AppError::http(503, "Unavailable");
        assert!(err.to_string().contains("Status: 503"));

        let err = AppError::validation("Weak password").with_action("Choose another");
        assert!(err.to_string().contains("Action:"));
    }
}
