//! Printer transports
//!
//! Supports:
//! - Serial printers (named port + baud rate)
//! - Network printers (raw TCP, port 9100)
//!
//! Every call opens its own port or socket and closes it before returning.
//! Payloads are opaque; nothing is read back from the printer.

use crate::error::{PrintError, PrintResult};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{info, instrument, warn};

/// Raw printing port understood by most label printers
pub const RAW_PRINT_PORT: u16 = 9100;

/// Payload sent by the network connection test
pub const TEST_PAYLOAD: &[u8] = b"TEST";

/// Trait for printer adapters
#[allow(async_fn_in_trait)]
pub trait Printer {
    /// Send raw bytes to the printer
    async fn print(&self, data: &[u8]) -> PrintResult<()>;

    /// Check if the printer is reachable
    async fn is_online(&self) -> bool;
}

/// Network printer (raw TCP)
#[derive(Debug, Clone)]
pub struct NetworkPrinter {
    host: String,
    port: u16,
    timeout: Duration,
}

impl NetworkPrinter {
    /// Create a new network printer; `host` is an IP address or hostname
    pub fn new(host: &str, port: u16) -> PrintResult<Self> {
        let host = host.trim();
        if host.is_empty() {
            return Err(PrintError::InvalidConfig(
                "Printer address is empty".to_string(),
            ));
        }
        Ok(Self {
            host: host.to_string(),
            port,
            timeout: Duration::from_secs(5),
        })
    }

    /// Set connect/send timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// `host:port`
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    async fn connect(&self) -> PrintResult<TcpStream> {
        tokio::time::timeout(
            self.timeout,
            TcpStream::connect((self.host.as_str(), self.port)),
        )
        .await
        .map_err(|_| PrintError::Timeout(format!("Connection timeout: {}", self.addr())))?
        .map_err(|e| PrintError::Connection(format!("{}: {}", self.addr(), e)))
    }
}

impl Printer for NetworkPrinter {
    #[instrument(skip(self, data), fields(addr = %self.addr(), data_len = data.len()))]
    async fn print(&self, data: &[u8]) -> PrintResult<()> {
        info!("Connecting to printer");
        let mut stream = self.connect().await?;

        info!("Connected, sending {} bytes", data.len());
        let send = async {
            stream.write_all(data).await?;
            stream.flush().await?;
            stream.shutdown().await
        };
        tokio::time::timeout(self.timeout, send)
            .await
            .map_err(|_| PrintError::Timeout(format!("Send timeout: {}", self.addr())))?
            .map_err(|e| {
                PrintError::Io(std::io::Error::new(e.kind(), format!("Write failed: {}", e)))
            })?;

        info!("Print job sent successfully");
        Ok(())
    }

    #[instrument(skip(self), fields(addr = %self.addr()))]
    async fn is_online(&self) -> bool {
        match self.connect().await {
            Ok(_) => {
                info!("Printer online");
                true
            }
            Err(e) => {
                warn!(error = %e, "Printer offline");
                false
            }
        }
    }
}

/// Serial printer
///
/// Blocking port I/O runs on the blocking thread pool.
#[derive(Debug, Clone)]
pub struct SerialPrinter {
    port: String,
    baud: u32,
    timeout: Duration,
}

impl SerialPrinter {
    pub fn new(port: &str, baud: u32) -> PrintResult<Self> {
        let port = port.trim();
        if port.is_empty() {
            return Err(PrintError::InvalidConfig("No port set".to_string()));
        }
        Ok(Self {
            port: port.to_string(),
            baud,
            timeout: Duration::from_secs(2),
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn baud(&self) -> u32 {
        self.baud
    }

    /// Open the port and close it again
    pub async fn probe(&self) -> PrintResult<()> {
        self.with_port(|_| Ok(())).await
    }

    async fn with_port<F>(&self, f: F) -> PrintResult<()>
    where
        F: FnOnce(&mut dyn serialport::SerialPort) -> std::io::Result<()> + Send + 'static,
    {
        let (port, baud, timeout) = (self.port.clone(), self.baud, self.timeout);
        tokio::task::spawn_blocking(move || -> PrintResult<()> {
            let mut handle = serialport::new(&port, baud).timeout(timeout).open()?;
            f(handle.as_mut())?;
            // Port closes on drop
            Ok(())
        })
        .await
        .map_err(|e| PrintError::Io(std::io::Error::other(e)))?
    }
}

impl Printer for SerialPrinter {
    #[instrument(skip(self, data), fields(port = %self.port, baud = self.baud, data_len = data.len()))]
    async fn print(&self, data: &[u8]) -> PrintResult<()> {
        let payload = data.to_vec();
        self.with_port(move |port| {
            port.write_all(&payload)?;
            port.flush()
        })
        .await?;
        info!("Print job written to serial port");
        Ok(())
    }

    #[instrument(skip(self), fields(port = %self.port))]
    async fn is_online(&self) -> bool {
        match self.probe().await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Serial printer unavailable");
                false
            }
        }
    }
}

/// Result of a delivery attempt, suitable for showing to an operator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryOutcome {
    pub success: bool,
    pub message: String,
}

impl DeliveryOutcome {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// The one transport selected for a job
#[derive(Debug, Clone)]
pub enum PrinterTransport {
    Serial(SerialPrinter),
    Network(NetworkPrinter),
}

impl PrinterTransport {
    pub fn describe(&self) -> String {
        match self {
            Self::Serial(p) => format!("serial {} @ {}", p.port(), p.baud()),
            Self::Network(p) => format!("network {}", p.addr()),
        }
    }

    /// Send `data` once. Errors are folded into the outcome, never returned.
    pub async fn deliver(&self, data: &[u8]) -> DeliveryOutcome {
        let (result, sent) = match self {
            Self::Serial(p) => (p.print(data).await, "Sent to serial printer"),
            Self::Network(p) => (p.print(data).await, "Sent to network printer"),
        };
        match result {
            Ok(()) => DeliveryOutcome::ok(sent),
            Err(e) => {
                warn!(transport = %self.describe(), error = %e, "delivery failed");
                DeliveryOutcome::failed(e.to_string())
            }
        }
    }

    /// Connectivity check: serial opens and closes the port, network sends
    /// the four bytes `TEST`.
    pub async fn test_connection(&self) -> DeliveryOutcome {
        match self {
            Self::Serial(p) => match p.probe().await {
                Ok(()) => DeliveryOutcome::ok(format!("Opened {} OK", p.port())),
                Err(e) => DeliveryOutcome::failed(e.to_string()),
            },
            Self::Network(_) => self.deliver(TEST_PAYLOAD).await,
        }
    }
}

/// Serial ports visible to the OS
pub fn list_ports() -> PrintResult<Vec<String>> {
    Ok(serialport::available_ports()?
        .into_iter()
        .map(|p| p.port_name)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    async fn capture_one() -> (u16, tokio::task::JoinHandle<Vec<u8>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            sock.read_to_end(&mut buf).await.unwrap();
            buf
        });
        (port, handle)
    }

    #[test]
    fn test_empty_host_rejected() {
        assert!(matches!(
            NetworkPrinter::new("  ", RAW_PRINT_PORT),
            Err(PrintError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_empty_serial_port_rejected() {
        assert!(matches!(
            SerialPrinter::new("", 9600),
            Err(PrintError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_network_delivers_all_bytes() {
        let (port, received) = capture_one().await;
        let payload: Vec<u8> = (0..50_000u32).map(|i| (i % 251) as u8).collect();

        let transport = PrinterTransport::Network(NetworkPrinter::new("127.0.0.1", port).unwrap());
        let outcome = transport.deliver(&payload).await;

        assert_eq!(outcome, DeliveryOutcome::ok("Sent to network printer"));
        assert_eq!(received.await.unwrap(), payload);
    }

    #[tokio::test]
    async fn test_network_test_connection_sends_test() {
        let (port, received) = capture_one().await;
        let transport = PrinterTransport::Network(NetworkPrinter::new("127.0.0.1", port).unwrap());
        assert!(transport.test_connection().await.success);
        assert_eq!(received.await.unwrap(), b"TEST");
    }

    #[tokio::test]
    async fn test_unreachable_network_reports_failure() {
        // Bind then drop to get a port nobody listens on
        let port = {
            let l = TcpListener::bind("127.0.0.1:0").await.unwrap();
            l.local_addr().unwrap().port()
        };
        let printer = NetworkPrinter::new("127.0.0.1", port)
            .unwrap()
            .with_timeout(Duration::from_millis(500));
        assert!(!printer.is_online().await);

        let outcome = PrinterTransport::Network(printer).deliver(b"data").await;
        assert!(!outcome.success);
        assert!(!outcome.message.is_empty());
    }

    #[tokio::test]
    async fn test_missing_serial_port_reports_failure() {
        let printer = SerialPrinter::new("/dev/does-not-exist-42", 38400).unwrap();
        assert!(!printer.is_online().await);

        let transport = PrinterTransport::Serial(printer);
        let outcome = transport.deliver(b"^XA^XZ").await;
        assert!(!outcome.success);
        assert!(!transport.test_connection().await.success);
    }

    #[test]
    fn test_describe() {
        let t = PrinterTransport::Network(NetworkPrinter::new("10.0.0.9", 9100).unwrap());
        assert_eq!(t.describe(), "network 10.0.0.9:9100");
        let t = PrinterTransport::Serial(SerialPrinter::new("COM1", 38400).unwrap());
        assert_eq!(t.describe(), "serial COM1 @ 38400");
    }
}
