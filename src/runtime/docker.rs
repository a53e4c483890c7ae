use async_trait::async_trait;
use bollard::container::{
    ListContainersOptions, LogsOptions, RemoveContainerOptions, StartContainerOptions,
    StatsOptions, StopContainerOptions,
};
use bollard::volume::ListVolumesOptions;
use bollard::Docker;
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use log::{debug, warn};
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

use crate::error_handling::types::RuntimeError;
use crate::runtime::types::{ContainerRuntime, EngineInfo, RawContainer, RawPort, RawStats};

/// Docker Engine implementation of [`ContainerRuntime`].
///
/// Every API call carries a bounded timeout so a hung daemon degrades into
/// an error instead of stalling the reconcile loop.
pub struct DockerRuntime {
    docker: Docker,
    call_timeout: Duration,
    stats_timeout: Duration,
}

impl DockerRuntime {
    /// Connects with the local platform defaults (unix socket on Linux).
    ///
    /// The connection is lazy; daemon availability surfaces on the first
    /// call, not here.
    pub fn connect(call_timeout: Duration, stats_timeout: Duration) -> Result<Self, RuntimeError> {
        let docker = Docker::connect_with_local_defaults()?;
        debug!(
            "Docker runtime client created (call timeout {:?}, stats timeout {:?})",
            call_timeout, stats_timeout
        );
        Ok(Self {
            docker,
            call_timeout,
            stats_timeout,
        })
    }

    async fn bounded<T, F>(&self, what: &str, limit: Duration, fut: F) -> Result<T, RuntimeError>
    where
        F: Future<Output = Result<T, bollard::errors::Error>>,
    {
        match timeout(limit, fut).await {
            Ok(result) => result.map_err(RuntimeError::from),
            Err(_) => Err(RuntimeError::Timeout(format!(
                "{} did not complete within {}s",
                what,
                limit.as_secs()
            ))),
        }
    }

    /// Fetches StartedAt for a running container. Best-effort: a failed
    /// inspect leaves the uptime unknown rather than failing the listing.
    async fn started_at(&self, id: &str) -> Option<DateTime<Utc>> {
        let inspect = self
            .bounded("inspect", self.call_timeout, self.docker.inspect_container(id, None))
            .await;
        match inspect {
            Ok(response) => response
                .state
                .and_then(|s| s.started_at)
                .and_then(|raw| parse_runtime_timestamp(&raw)),
            Err(e) => {
                warn!("Failed to inspect container {}: {}", id, e);
                None
            }
        }
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn list_containers(&self) -> Result<Vec<RawContainer>, RuntimeError> {
        let options = ListContainersOptions::<String> {
            all: true,
            ..Default::default()
        };
        let summaries = self
            .bounded(
                "list containers",
                self.call_timeout,
                self.docker.list_containers(Some(options)),
            )
            .await?;

        let mut containers = Vec::with_capacity(summaries.len());
        for summary in summaries {
            let id = match summary.id {
                Some(id) => id,
                None => continue,
            };
            let state = summary.state.unwrap_or_default();
            // StartedAt only lives in the inspect payload; fetch it for
            // running containers so uptime can be derived.
            let started_at = if state == "running" {
                self.started_at(&id).await
            } else {
                None
            };

            containers.push(RawContainer {
                name: summary
                    .names
                    .and_then(|names| names.into_iter().next())
                    .map(|n| n.trim_start_matches('/').to_string())
                    .unwrap_or_else(|| id.clone()),
                image: summary.image.unwrap_or_default(),
                state,
                status_text: summary.status.unwrap_or_default(),
                ports: summary
                    .ports
                    .unwrap_or_default()
                    .into_iter()
                    .map(|p| RawPort {
                        container_port: p.private_port,
                        host_port: p.public_port,
                        protocol: p
                            .typ
                            .map(|t| t.to_string().to_lowercase())
                            .unwrap_or_else(|| "tcp".to_string()),
                    })
                    .collect(),
                created_at: summary.created.and_then(|secs| DateTime::from_timestamp(secs, 0)),
                started_at,
                id,
            });
        }

        debug!("Listed {} containers from runtime", containers.len());
        Ok(containers)
    }

    async fn stats(&self, container_id: &str) -> Result<RawStats, RuntimeError> {
        let options = StatsOptions {
            stream: false,
            one_shot: false,
        };
        let mut stream = self.docker.stats(container_id, Some(options));
        let sample = match timeout(self.stats_timeout, stream.next()).await {
            Ok(Some(result)) => result.map_err(RuntimeError::from)?,
            Ok(None) => {
                return Err(RuntimeError::Api(format!(
                    "stats stream for {} ended without a sample",
                    container_id
                )))
            }
            Err(_) => {
                return Err(RuntimeError::Timeout(format!(
                    "stats for {} did not complete within {}s",
                    container_id,
                    self.stats_timeout.as_secs()
                )))
            }
        };

        Ok(RawStats {
            cpu_total_usage: sample.cpu_stats.cpu_usage.total_usage,
            precpu_total_usage: sample.precpu_stats.cpu_usage.total_usage,
            system_cpu_usage: sample.cpu_stats.system_cpu_usage.unwrap_or(0),
            presystem_cpu_usage: sample.precpu_stats.system_cpu_usage.unwrap_or(0),
            online_cpus: sample.cpu_stats.online_cpus.unwrap_or(1) as u32,
            memory_usage_bytes: sample.memory_stats.usage.unwrap_or(0),
            memory_limit_bytes: sample.memory_stats.limit.unwrap_or(0),
        })
    }

    async fn logs(&self, container_id: &str, tail: usize) -> Result<Vec<String>, RuntimeError> {
        let options = LogsOptions::<String> {
            stdout: true,
            stderr: true,
            tail: tail.to_string(),
            ..Default::default()
        };
        let mut stream = self.docker.logs(container_id, Some(options));

        let collect = async {
            let mut lines = Vec::new();
            while let Some(chunk) = stream.next().await {
                let chunk = chunk?;
                let text = String::from_utf8_lossy(&chunk.into_bytes()).into_owned();
                for line in text.lines() {
                    lines.push(line.to_string());
                }
            }
            Ok::<_, bollard::errors::Error>(lines)
        };

        match timeout(self.call_timeout, collect).await {
            Ok(result) => result.map_err(RuntimeError::from),
            Err(_) => Err(RuntimeError::Timeout(format!(
                "logs for {} did not complete within {}s",
                container_id,
                self.call_timeout.as_secs()
            ))),
        }
    }

    async fn engine_info(&self) -> Result<EngineInfo, RuntimeError> {
        let version = self
            .bounded("version", self.call_timeout, self.docker.version())
            .await?;
        let info = self
            .bounded("info", self.call_timeout, self.docker.info())
            .await?;
        let volumes = self
            .bounded(
                "list volumes",
                self.call_timeout,
                self.docker.list_volumes(None::<ListVolumesOptions<String>>),
            )
            .await?;

        Ok(EngineInfo {
            version: version.version.unwrap_or_default(),
            api_version: version.api_version.unwrap_or_default(),
            containers_total: info.containers.unwrap_or(0).max(0) as u64,
            containers_running: info.containers_running.unwrap_or(0).max(0) as u64,
            images: info.images.unwrap_or(0).max(0) as u64,
            volumes: volumes.volumes.map(|v| v.len() as u64).unwrap_or(0),
        })
    }

    async fn start_container(&self, container_id: &str) -> Result<(), RuntimeError> {
        self.bounded(
            "start container",
            self.call_timeout,
            self.docker
                .start_container(container_id, None::<StartContainerOptions<String>>),
        )
        .await
    }

    async fn stop_container(&self, container_id: &str) -> Result<(), RuntimeError> {
        self.bounded(
            "stop container",
            self.call_timeout,
            self.docker
                .stop_container(container_id, Some(StopContainerOptions { t: 10 })),
        )
        .await
    }

    async fn remove_container(&self, container_id: &str) -> Result<(), RuntimeError> {
        self.bounded(
            "remove container",
            self.call_timeout,
            self.docker.remove_container(
                container_id,
                Some(RemoveContainerOptions {
                    force: false,
                    v: false,
                    ..Default::default()
                }),
            ),
        )
        .await
    }
}

/// Parses an RFC 3339 timestamp from the runtime, rejecting the zero value
/// Docker reports for containers that never started.
fn parse_runtime_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
        .filter(|dt| dt.timestamp() > 0)
}
