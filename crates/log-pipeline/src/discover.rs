//! nginx 설정 파일 위치 탐색
//!
//! 설정 파일 경로가 주어지지 않으면 `nginx -V`를 실행해 빌드 옵션에서
//! `--conf-path=`(없으면 `--prefix=` + `/conf/nginx.conf`)를 찾습니다.
//! nginx는 버전 정보를 stderr로 출력합니다.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, info};

use botstat_core::config::SourceConfig;

use crate::error::LogPipelineError;
use crate::nginx_conf::NginxConfig;

/// 빌드 옵션에서 경로를 찾지 못했을 때 사용하는 설정 파일 경로
pub const DEFAULT_NGINX_CONFIG: &str = "/etc/nginx/nginx.conf";

/// nginx 바이너리에 설정 파일 경로를 질의하는 탐색기
#[derive(Debug, Clone)]
pub struct NginxLocator {
    binary: String,
    timeout: Duration,
}

impl NginxLocator {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    /// `[source]` 설정의 바이너리와 대기 한도를 사용합니다.
    pub fn from_config(config: &SourceConfig) -> Self {
        Self::new(
            config.nginx_binary.clone(),
            Duration::from_secs(config.discovery_timeout_secs),
        )
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// `<binary> -V`를 실행해 설정 파일 경로를 알아냅니다.
    ///
    /// # Errors
    /// - 바이너리를 실행할 수 없으면 `BinaryNotFound`
    /// - 제한 시간 안에 끝나지 않으면 `DiscoveryTimeout`
    pub async fn config_path(&self) -> Result<PathBuf, LogPipelineError> {
        let child = Command::new(&self.binary)
            .arg("-V")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    LogPipelineError::BinaryNotFound(self.binary.clone())
                } else {
                    LogPipelineError::Io(e)
                }
            })?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| LogPipelineError::DiscoveryTimeout {
                binary: self.binary.clone(),
                timeout_secs: self.timeout.as_secs(),
            })??;

        let stderr = String::from_utf8_lossy(&output.stderr);
        let path = parse_version_output(&stderr);
        debug!(binary = %self.binary, path = %path.display(), "detected nginx config path");
        Ok(path)
    }
}

/// `nginx -V` 출력에서 설정 파일 경로를 결정합니다.
pub fn parse_version_output(output: &str) -> PathBuf {
    let option = |name: &str| {
        output
            .split_whitespace()
            .find_map(|token| token.strip_prefix(name))
    };

    if let Some(conf_path) = option("--conf-path=") {
        return PathBuf::from(conf_path);
    }
    if let Some(prefix) = option("--prefix=") {
        return PathBuf::from(format!("{prefix}/conf/nginx.conf"));
    }
    PathBuf::from(DEFAULT_NGINX_CONFIG)
}

/// 설정 파일을 읽어 해석합니다.
pub async fn read_config(path: &Path) -> Result<NginxConfig, LogPipelineError> {
    let text = tokio::fs::read_to_string(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            LogPipelineError::ConfigNotFound(path.display().to_string())
        } else {
            LogPipelineError::Io(e)
        }
    })?;
    Ok(NginxConfig::parse(path.display().to_string(), &text))
}

/// 명시된 설정 파일 또는 nginx 바이너리가 알려준 설정 파일을 읽습니다.
pub async fn locate_config(
    explicit: Option<&Path>,
    locator: &NginxLocator,
) -> Result<NginxConfig, LogPipelineError> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => locator.config_path().await?,
    };
    info!(path = %path.display(), "reading nginx config");
    read_config(&path).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conf_path_wins() {
        let output = "nginx version: nginx/1.14.0 (Ubuntu)\n\
                      configure arguments: --with-cc-opt='-g -O2' --prefix=/usr/share/nginx \
                      --conf-path=/etc/nginx/nginx.conf --http-log-path=/var/log/nginx/access.log";
        assert_eq!(
            parse_version_output(output),
            PathBuf::from("/etc/nginx/nginx.conf")
        );
    }

    #[test]
    fn prefix_fallback() {
        let output = "configure arguments: --prefix=/opt/nginx --with-http_ssl_module";
        assert_eq!(
            parse_version_output(output),
            PathBuf::from("/opt/nginx/conf/nginx.conf")
        );
    }

    #[test]
    fn default_fallback() {
        assert_eq!(
            parse_version_output("nginx version: nginx/1.25.3"),
            PathBuf::from(DEFAULT_NGINX_CONFIG)
        );
    }

    #[tokio::test]
    async fn missing_binary_is_reported() {
        let locator = NginxLocator::new(
            "botstat-test-no-such-nginx-binary",
            Duration::from_secs(1),
        );
        let err = locator.config_path().await.unwrap_err();
        assert!(matches!(err, LogPipelineError::BinaryNotFound(ref b) if b.contains("no-such")));
    }

    #[tokio::test]
    async fn missing_config_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nginx.conf");
        let err = read_config(&path).await.unwrap_err();
        assert!(matches!(err, LogPipelineError::ConfigNotFound(_)));
    }

    #[tokio::test]
    async fn explicit_config_skips_binary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nginx.conf");
        std::fs::write(&path, "http { access_log /var/log/x.log; }").unwrap();

        let locator = NginxLocator::new("botstat-test-no-such-nginx-binary", Duration::from_secs(1));
        let config = locate_config(Some(&path), &locator).await.unwrap();
        assert_eq!(config.access_logs().len(), 1);
        assert_eq!(config.source(), path.display().to_string());
    }

    #[cfg(unix)]
    mod process {
        use super::*;
        use serial_test::serial;
        use std::os::unix::fs::PermissionsExt;

        fn script(dir: &Path, body: &str) -> PathBuf {
            let path = dir.join("fake-nginx");
            std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        #[tokio::test]
        #[serial]
        async fn reads_conf_path_from_stderr() {
            let dir = tempfile::tempdir().unwrap();
            let binary = script(
                dir.path(),
                "echo 'configure arguments: --conf-path=/srv/nginx/nginx.conf' >&2",
            );
            let locator = NginxLocator::new(binary.display().to_string(), Duration::from_secs(5));
            assert_eq!(
                locator.config_path().await.unwrap(),
                PathBuf::from("/srv/nginx/nginx.conf")
            );
        }

        #[tokio::test]
        #[serial]
        async fn slow_binary_times_out() {
            let dir = tempfile::tempdir().unwrap();
            let binary = script(dir.path(), "sleep 5");
            let locator =
                NginxLocator::new(binary.display().to_string(), Duration::from_millis(100));
            let err = locator.config_path().await.unwrap_err();
            assert!(matches!(err, LogPipelineError::DiscoveryTimeout { .. }));
        }
    }
}
