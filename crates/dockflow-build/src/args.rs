//! リリースチャンネル引数の解決
//!
//! `--pr` / `--canary` の値を解釈します。不正な値はエラーにせず、
//! 決められたフォールバックに落とします。

use crate::naming::validate_tag;

/// 名前付き引数の状態
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ArgValue {
    /// 指定なし
    #[default]
    Absent,
    /// 値なしで指定された（`--pr` の直後が欠落、またはフラグ形式のトークン）
    Flag,
    Value(String),
}

impl ArgValue {
    /// clap の `Option<Option<String>>` (`num_args = 0..=1`) から変換
    ///
    /// 空文字列やフラグ形式の値は「値なしのフラグ」として扱う。
    pub fn from_optional(raw: Option<Option<String>>) -> Self {
        match raw {
            None => ArgValue::Absent,
            Some(None) => ArgValue::Flag,
            Some(Some(value)) => {
                let value = value.trim();
                if value.is_empty() || value.starts_with('-') {
                    ArgValue::Flag
                } else {
                    ArgValue::Value(value.to_string())
                }
            }
        }
    }

    pub fn is_present(&self) -> bool {
        !matches!(self, ArgValue::Absent)
    }

    pub fn value(&self) -> Option<&str> {
        match self {
            ArgValue::Value(v) => Some(v.as_str()),
            _ => None,
        }
    }
}

/// リリースチャンネルを選ぶための引数
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChannelArgs {
    pub pr: ArgValue,
    pub canary: bool,
}

impl ChannelArgs {
    /// タグとして使えない PR 値は「値なし」に落とす（結果は canary）
    pub fn new(pr: Option<Option<String>>, canary: bool) -> Self {
        let pr = match ArgValue::from_optional(pr) {
            ArgValue::Value(value) => match validate_tag(&value) {
                Ok(()) => ArgValue::Value(value),
                Err(e) => {
                    tracing::warn!("--pr value is not a valid tag ({}), falling back to canary", e);
                    ArgValue::Flag
                }
            },
            ArgValue::Flag => {
                tracing::warn!("--pr was given without a number, falling back to canary");
                ArgValue::Flag
            }
            ArgValue::Absent => ArgValue::Absent,
        };
        Self { pr, canary }
    }

    /// PR 番号（値付きで指定された場合のみ）
    pub fn pr_number(&self) -> Option<&str> {
        self.pr.value()
    }
}
