//! Error Kind - Classification of errors
//!
//! Defines the [`ErrorKind`] enum shared by every layer between the UI and
//! the network.

use serde::Serialize;

/// エラー種別の列挙体
///
/// ネットワーク層・認証層・楽観的更新層で共通に使うエラー分類です。
/// 呼び出し側はこの分類で「再試行すべきか」「再ログインが必要か」
/// 「エラー表示を出すべきか」を判断します。
///
/// ## Notes
/// * `non_exhaustive` - 将来的に列挙子が追加される可能性があることを示す
///
/// ## Examples
/// ```rust
/// use kernel::error::kind::ErrorKind;
///
/// let kind = ErrorKind::AuthExpired;
/// assert!(kind.is_auth());
/// assert_eq!(kind.as_str(), "Authentication Expired");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum ErrorKind {
    /// 通信エラー（接続失敗・タイムアウト）。ログイン失敗回数には数えない
    Transport,
    /// 認証期限切れ。トークン更新フローの起点となる（回復可能）
    AuthExpired,
    /// 認証拒否。更新失敗または再試行後も拒否された（再ログインが必要）
    AuthRejected,
    /// 入力検証エラー。フィードバックはデータとして返す
    Validation,
    /// 明示的な破棄によるキャンセル。UI はエラー表示を出さない
    Cancelled,
    /// 上記以外の非成功 HTTP ステータス
    Http,
    /// 永続化ストレージの読み書きエラー
    Storage,
    /// 内部エラー
    Internal,
}

impl ErrorKind {
    /// ユーザー向けの文字列表現を取得
    ///
    /// ## Examples
    /// ```rust
    /// use kernel::error::kind::ErrorKind;
    /// assert_eq!(ErrorKind::Cancelled.as_str(), "Cancelled");
    /// ```
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Transport => "Transport Error",
            ErrorKind::AuthExpired => "Authentication Expired",
            ErrorKind::AuthRejected => "Authentication Rejected",
            ErrorKind::Validation => "Validation Error",
            ErrorKind::Cancelled => "Cancelled",
            ErrorKind::Http => "HTTP Error",
            ErrorKind::Storage => "Storage Error",
            ErrorKind::Internal => "Internal Error",
        }
    }

    /// 認証に関するエラーかどうか
    #[inline]
    pub const fn is_auth(&self) -> bool {
        matches!(self, ErrorKind::AuthExpired | ErrorKind::AuthRejected)
    }

    /// 再ログインが必要なエラーかどうか
    ///
    /// `AuthRejected` のみが終端扱いです。`AuthExpired` は更新で回復できます。
    #[inline]
    pub const fn requires_reauthentication(&self) -> bool {
        matches!(self, ErrorKind::AuthRejected)
    }

    /// 明示的なキャンセルかどうか
    ///
    /// キャンセルは本物の失敗と区別し、エラートーストを出さないために使います。
    #[inline]
    pub const fn is_cancellation(&self) -> bool {
        matches!(self, ErrorKind::Cancelled)
    }

    /// 単純な再試行で回復し得るかどうか
    #[inline]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Transport)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_classification() {
        assert!(ErrorKind::AuthExpired.is_auth());
        assert!(ErrorKind::AuthRejected.is_auth());
        assert!(!ErrorKind::Transport.is_auth());

        assert!(ErrorKind::AuthRejected.requires_reauthentication());
        assert!(!ErrorKind::AuthExpired.requires_reauthentication());
    }

    #[test]
    fn test_cancellation_is_distinguishable() {
        assert!(ErrorKind::Cancelled.is_cancellation());
        assert!(!ErrorKind::Transport.is_cancellation());
        assert!(!ErrorKind::Http.is_cancellation());
    }

    #[test]
    fn test_only_transport_is_retryable() {
        assert!(ErrorKind::Transport.is_retryable());
        assert!(!ErrorKind::AuthRejected.is_retryable());
        assert!(!ErrorKind::Validation.is_retryable());
    }

    #[test]
    fn test_serialize_screaming_snake() {
        let json = serde_json::to_string(&ErrorKind::AuthExpired).unwrap();
        assert_eq!(json, r#""AUTH_EXPIRED""#);
    }
}
