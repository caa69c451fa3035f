//! yt-dlp Resolver - 调用 yt-dlp 解析与下载歌曲
//!
//! 实现 SongResolverPort trait
//!
//! 命令:
//! - 解析: yt-dlp -J --flat-playlist <query>
//! - 流地址: yt-dlp -f bestaudio -g <link>
//! - 下载: yt-dlp -f bestaudio -o <dir>/<stem>.src.%(ext)s --print after_move:filepath <link>

use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::application::ports::{ResolveError, ResolvedRequest, SongResolverPort};
use crate::domain::song::{is_known_domain, SongInfo};

/// yt-dlp 配置
#[derive(Debug, Clone)]
pub struct YtDlpConfig {
    /// yt-dlp 可执行文件
    pub binary: PathBuf,
    /// cookies.txt 路径
    pub cookie_file: Option<PathBuf>,
    /// yt-dlp 缓存目录
    pub cache_dir: Option<PathBuf>,
    /// 解析与取流超时（秒）
    pub timeout_secs: u64,
    /// 下载超时（秒）
    pub download_timeout_secs: u64,
}

impl Default for YtDlpConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("yt-dlp"),
            cookie_file: None,
            cache_dir: None,
            timeout_secs: 30,
            download_timeout_secs: 600,
        }
    }
}

/// yt-dlp 解析器
pub struct YtDlpResolver {
    config: YtDlpConfig,
}

impl YtDlpResolver {
    pub fn new(config: YtDlpConfig) -> Self {
        Self { config }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.config.binary);
        cmd.arg("--no-warnings")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cookies) = &self.config.cookie_file {
            if cookies.exists() {
                cmd.arg("--cookies").arg(cookies);
            }
        }
        match &self.config.cache_dir {
            Some(dir) => cmd.arg("--cache-dir").arg(dir),
            None => cmd.arg("--no-cache-dir"),
        };
        cmd
    }

    /// 执行命令并返回 stdout
    async fn run(&self, mut cmd: Command, timeout_secs: u64) -> Result<String, ResolveError> {
        let output = tokio::time::timeout(Duration::from_secs(timeout_secs), cmd.output())
            .await
            .map_err(|_| ResolveError::Timeout)?
            .map_err(|e| ResolveError::IoError(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ResolveError::ToolFailed(format!(
                "yt-dlp exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl SongResolverPort for YtDlpResolver {
    async fn resolve(&self, query: &str) -> Result<ResolvedRequest, ResolveError> {
        let mut cmd = self.command();
        cmd.arg("-J").arg("--flat-playlist").arg("--").arg(query);

        tracing::debug!(query = %query, "Resolving song request");

        let stdout = self
            .run(cmd, self.config.timeout_secs)
            .await
            .map_err(|e| match e {
                ResolveError::ToolFailed(msg) => ResolveError::InvalidQuery(msg),
                other => other,
            })?;

        let info: Value = serde_json::from_str(&stdout)
            .map_err(|e| ResolveError::InvalidQuery(format!("unparsable yt-dlp output: {}", e)))?;
        let resolved = parse_request(&info)?;

        tracing::info!(
            query = %query,
            playable = resolved.songs.len(),
            unplayable = resolved.unplayable,
            "Song request resolved"
        );
        Ok(resolved)
    }

    async fn stream_url(&self, song: &SongInfo) -> Result<String, ResolveError> {
        let link = song
            .link()
            .map_err(|e| ResolveError::UnsupportedDomain(e.to_string()))?;
        let mut cmd = self.command();
        cmd.arg("-f").arg("bestaudio").arg("-g").arg("--").arg(&link);

        let stdout = self.run(cmd, self.config.timeout_secs).await?;
        stdout
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string)
            .ok_or_else(|| ResolveError::ToolFailed(format!("no stream url for {}", link)))
    }

    async fn download(
        &self,
        song: &SongInfo,
        dir: &Path,
        stem: &str,
    ) -> Result<PathBuf, ResolveError> {
        let link = song
            .link()
            .map_err(|e| ResolveError::UnsupportedDomain(e.to_string()))?;
        let template = dir.join(format!("{}.src.%(ext)s", stem));

        let mut cmd = self.command();
        cmd.arg("-f")
            .arg("bestaudio")
            .arg("--no-playlist")
            .arg("--no-part")
            .arg("-o")
            .arg(&template)
            .arg("--print")
            .arg("after_move:filepath")
            .arg("--no-simulate")
            .arg("--")
            .arg(&link);

        tracing::debug!(link = %link, template = %template.display(), "Downloading source audio");

        let stdout = self.run(cmd, self.config.download_timeout_secs).await?;
        let path = stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .last()
            .map(PathBuf::from)
            .ok_or_else(|| ResolveError::ToolFailed("yt-dlp printed no file path".to_string()))?;

        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(ResolveError::ToolFailed(format!(
                "downloaded file does not exist: {}",
                path.display()
            )));
        }
        Ok(path)
    }
}

/// 解析 yt-dlp 的 JSON 输出
fn parse_request(info: &Value) -> Result<ResolvedRequest, ResolveError> {
    if !info.is_object() {
        return Err(ResolveError::InvalidQuery(
            "yt-dlp output is not an object".to_string(),
        ));
    }

    let mut resolved = ResolvedRequest::default();
    let kind = info.get("_type").and_then(Value::as_str).unwrap_or("video");

    if kind == "playlist" {
        let entries = info.get("entries").and_then(Value::as_array);
        for entry in entries.into_iter().flatten() {
            collect_entry(entry, &mut resolved);
        }
    } else {
        collect_entry(info, &mut resolved);
    }

    Ok(resolved)
}

fn collect_entry(entry: &Value, resolved: &mut ResolvedRequest) {
    match song_from_entry(entry) {
        Some(song) => resolved.songs.push(song),
        None => {
            let id = entry.get("id").and_then(|v| v.as_str()).unwrap_or("?");
            tracing::debug!(id, "Skipping unplayable entry");
            resolved.unplayable += 1;
        }
    }
}

fn song_from_entry(entry: &Value) -> Option<SongInfo> {
    let kind = entry.get("_type").and_then(Value::as_str).unwrap_or("video");
    if kind != "video" && kind != "url" {
        return None;
    }

    let domain = entry
        .get("ie_key")
        .or_else(|| entry.get("extractor_key"))
        .and_then(Value::as_str)?
        .to_lowercase();
    if !is_known_domain(&domain) {
        return None;
    }

    let id = entry.get("id").and_then(Value::as_str)?;
    let title = entry.get("title").and_then(Value::as_str)?;
    let duration = entry.get("duration").and_then(Value::as_f64)?;
    if !duration.is_finite() || duration < 0.0 {
        return None;
    }

    Some(SongInfo::new(domain, id, duration.round() as u32, title))
}
