//! # Logging モジュール
//!
//! 訓練シミュレーションのログ出力を初期化します。
//!
//! コンソールには人が読むためのcompact形式、ファイルには後から集計するための
//! JSON形式（日次ローテーション）で出力します。ファイル書き込みは非同期のため、
//! 時間刻みの処理を待たせません。
//!
//! 出力先は `console` / `file` / `both` から選択します。
//! 環境変数 `RUST_LOG` が設定されている場合はそちらのフィルタが優先されます。

use std::str::FromStr;

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// ログ出力先
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogOutput {
    Console,
    File,
    Both,
}

impl LogOutput {
    pub fn writes_console(&self) -> bool {
        matches!(self, LogOutput::Console | LogOutput::Both)
    }

    pub fn writes_file(&self) -> bool {
        matches!(self, LogOutput::File | LogOutput::Both)
    }
}

impl FromStr for LogOutput {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "console" | "stdout" => Ok(LogOutput::Console),
            "file" => Ok(LogOutput::File),
            "both" | "all" => Ok(LogOutput::Both),
            other => Err(format!("ログ出力先 '{}' は不明です (console, file, both)", other)),
        }
    }
}

/// ログ設定
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// `RUST_LOG` 未設定時の最大レベル
    pub level: Level,
    pub output: LogOutput,
    /// JSONログの出力ディレクトリ
    pub log_dir: String,
    /// ファイル名の接頭辞（`<prefix>.YYYY-MM-DD`）
    pub file_prefix: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            output: LogOutput::Both,
            log_dir: "logs".to_string(),
            file_prefix: "nblsim".to_string(),
        }
    }
}

/// グローバルなtracing購読者を設定
///
/// ファイル出力を含む場合は非同期ライタのガードを返します。ガードの破棄時に
/// 未書き込みのログが吐き出されるため、`main` の終わりまで保持してください。
/// 購読者が既に設定済みの場合はエラーになります。
///
/// ```no_run
/// use nblsim::logging::{init_logging, LogConfig, LogOutput};
///
/// let config = LogConfig {
///     output: LogOutput::Console,
///     ..LogConfig::default()
/// };
/// let _guard = init_logging(&config)?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn init_logging(config: &LogConfig) -> Result<Option<WorkerGuard>, Box<dyn std::error::Error>> {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(config.level).into())
        .from_env_lossy();

    let console_layer = config
        .output
        .writes_console()
        .then(|| fmt::layer().compact().with_target(true));

    let (file_layer, guard) = if config.output.writes_file() {
        let (writer, guard) = non_blocking(rolling::daily(&config.log_dir, &config.file_prefix));
        let layer = fmt::layer().json().with_target(true).with_writer(writer);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    Registry::default()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    Ok(guard)
}

/// ログレベル文字列を解釈（解釈できない場合は警告してINFO）
pub fn parse_log_level(level_str: &str) -> Level {
    level_str.trim().parse::<Level>().unwrap_or_else(|_| {
        eprintln!("警告: ログレベル '{}' は不明です。INFOを使用します", level_str);
        Level::INFO
    })
}

/// `-v` の指定回数に応じてログレベルを引き上げ
pub fn level_for_verbosity(base: Level, verbose_level: u8) -> Level {
    match verbose_level {
        0 => base,
        1 => base.max(Level::DEBUG),
        _ => Level::TRACE,
    }
}

/// ログディレクトリを作成
pub fn ensure_log_directory(log_dir: &str) -> std::io::Result<()> {
    std::fs::create_dir_all(log_dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_output_parsing() {
        assert_eq!("console".parse::<LogOutput>(), Ok(LogOutput::Console));
        assert_eq!("STDOUT".parse::<LogOutput>(), Ok(LogOutput::Console));
        assert_eq!("file".parse::<LogOutput>(), Ok(LogOutput::File));
        assert_eq!(" both ".parse::<LogOutput>(), Ok(LogOutput::Both));
        assert!("syslog".parse::<LogOutput>().is_err());
    }

    #[test]
    fn test_log_output_targets() {
        assert!(LogOutput::Console.writes_console() && !LogOutput::Console.writes_file());
        assert!(!LogOutput::File.writes_console() && LogOutput::File.writes_file());
        assert!(LogOutput::Both.writes_console() && LogOutput::Both.writes_file());
    }

    #[test]
    fn test_parse_log_level_falls_back_to_info() {
        assert_eq!(parse_log_level("debug"), Level::DEBUG);
        assert_eq!(parse_log_level("WARN"), Level::WARN);
        assert_eq!(parse_log_level("loud"), Level::INFO);
    }

    #[test]
    fn test_verbosity_raises_level() {
        assert_eq!(level_for_verbosity(Level::INFO, 0), Level::INFO);
        assert_eq!(level_for_verbosity(Level::INFO, 1), Level::DEBUG);
        assert_eq!(level_for_verbosity(Level::WARN, 1), Level::DEBUG);
        assert_eq!(level_for_verbosity(Level::TRACE, 1), Level::TRACE);
        assert_eq!(level_for_verbosity(Level::ERROR, 2), Level::TRACE);
    }

    #[test]
    fn test_ensure_log_directory_creates_nested_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let nested = dir.path().join("logs").join("today");
        ensure_log_directory(nested.to_str().unwrap()).unwrap();
        assert!(nested.is_dir());
    }
}
