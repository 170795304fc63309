// src/backends/ipc.rs
//! UDP request/response backend
//!
//! Each run is one datagram exchange with a remote wrapper: the request is
//! the run's argument list (see [`run_arguments`]), the response a single
//! result line. Requests go out one at a time per backend.

use crate::backends::cli::command::run_arguments;
use crate::backends::response_parser::ResponseParser;
use crate::evaluator::{RunExecutor, SharedObserver};
use crate::model::{AlgorithmRun, ExecutionConfig, RunConfig};
use crate::utils::errors::{EngineError, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::net::UdpSocket;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IpcOptions {
    pub remote_host: String,
    pub remote_port: u32,
    pub packet_size: usize,

    /// Report runs as persisted
    pub persistent: bool,
}

impl Default for IpcOptions {
    fn default() -> Self {
        Self {
            remote_host: "127.0.0.1".to_string(),
            remote_port: 0,
            packet_size: 4096,
            persistent: false,
        }
    }
}

impl IpcOptions {
    pub fn validate(&self) -> Result<()> {
        if !(1..=65535).contains(&self.remote_port) {
            return Err(EngineError::Parameter(format!(
                "IPC remote port must be between 1 and 65535, got {}",
                self.remote_port
            )));
        }
        if self.packet_size == 0 {
            return Err(EngineError::Parameter(
                "IPC packet size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Request payload: arguments separated by spaces, any argument containing
/// whitespace wrapped in double quotes
fn request_payload(rc: &RunConfig) -> String {
    let mut payload = String::new();
    for arg in run_arguments(rc) {
        if arg.chars().any(char::is_whitespace) {
            payload.push('"');
            payload.push_str(&arg);
            payload.push('"');
        } else {
            payload.push_str(&arg);
        }
        payload.push(' ');
    }
    payload
}

pub struct IpcBackend {
    exec: Arc<ExecutionConfig>,
    options: IpcOptions,
    parser: ResponseParser,
    socket: Mutex<UdpSocket>,
}

impl IpcBackend {
    pub fn new(exec: Arc<ExecutionConfig>, options: IpcOptions) -> Result<Self> {
        options.validate()?;

        let socket = UdpSocket::bind(("0.0.0.0", 0))?;
        socket.connect((options.remote_host.as_str(), options.remote_port as u16))?;
        info!(
            "IPC backend sending requests to {}:{}",
            options.remote_host, options.remote_port
        );

        Ok(Self {
            exec,
            options,
            parser: ResponseParser::new()?,
            socket: Mutex::new(socket),
        })
    }

    fn evaluate_one(&self, socket: &UdpSocket, rc: &RunConfig) -> Result<AlgorithmRun> {
        let payload = request_payload(rc);
        if payload.len() > self.options.packet_size {
            return Err(EngineError::abort(format!(
                "Request is too big to send to the remote wrapper, adjust the packet size on both ends: {} > {}",
                payload.len(),
                self.options.packet_size
            )));
        }

        let started = Instant::now();
        socket
            .send(payload.as_bytes())
            .map_err(|e| EngineError::abort(format!("Aborted due to socket error: {}", e)))?;

        let mut buffer = vec![0u8; self.options.packet_size];
        let received = socket
            .recv(&mut buffer)
            .map_err(|e| EngineError::abort(format!("Aborted due to socket error: {}", e)))?;
        let walltime = started.elapsed().as_secs_f64();

        let response = String::from_utf8_lossy(&buffer[..received]);
        let response = response.trim_end_matches('\0').trim();
        debug!("IPC response for {}: {}", rc, response);

        self.parser.parse(response, rc, &self.exec, walltime)
    }
}

impl RunExecutor for IpcBackend {
    fn name(&self) -> &'static str {
        "IPC"
    }

    fn execute(
        &self,
        runs: &[RunConfig],
        _observer: Option<&SharedObserver>,
    ) -> Result<Vec<AlgorithmRun>> {
        let socket = self.socket.lock();
        let mut completed = Vec::with_capacity(runs.len());

        for rc in runs {
            match self.evaluate_one(&socket, rc) {
                Ok(run) => completed.push(run),
                Err(EngineError::Abort { message, .. }) => {
                    return Err(EngineError::Abort {
                        message,
                        runs: completed,
                    })
                }
                Err(e) => return Err(e),
            }
        }
        Ok(completed)
    }

    fn are_runs_persisted(&self) -> bool {
        self.options.persistent
    }
}
