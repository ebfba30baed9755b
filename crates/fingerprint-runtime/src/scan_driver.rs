//! Drives scan batches on the device.
//!
//! A batch starts with the number of scans as a command. JSON firmware
//! answers with one line per scan, each a list of `{bssid, ssid, rssi}`
//! objects; text firmware prints a scan log that is fed to the tokenizer.

use std::time::Duration;

use chrono::Utc;
use fingerprint_core::error::Result;
use fingerprint_core::models::{NetworkReading, RawScanRecord};
use tokio::time;
use tracing::{debug, info, warn};

use crate::transport::LineTransport;

pub struct ScanDriver<T> {
    transport: T,
    read_timeout: Duration,
}

impl<T: LineTransport> ScanDriver<T> {
    pub fn new(transport: T, read_timeout: Duration) -> Self {
        Self {
            transport,
            read_timeout,
        }
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Ask the device for `amount` scans and collect them as raw records.
    ///
    /// The batch ends early on a read timeout, end of stream or a line that
    /// is not a JSON scan; scans received before that are returned. Only a
    /// transport failure is an error.
    pub async fn scan(&mut self, name: &str, location: &str, amount: u32) -> Result<Vec<RawScanRecord>> {
        self.transport.send_command(&amount.to_string()).await?;

        let mut records = Vec::with_capacity(amount as usize);
        while records.len() < amount as usize {
            let Some(line) = self.next_line().await? else {
                break;
            };
            if line.trim().is_empty() {
                continue;
            }

            let networks: Vec<NetworkReading> = match serde_json::from_str(line.trim()) {
                Ok(networks) => networks,
                Err(e) => {
                    warn!("Received {:?}: not a JSON scan ({}); ending batch", line, e);
                    break;
                }
            };

            info!("Scan {}/{} for {}: {} networks", records.len() + 1, amount, name, networks.len());
            for net in &networks {
                debug!("BSSID: {}, RSSI: {} SSID: {}", net.bssid, net.rssi, net.ssid);
            }

            records.push(RawScanRecord {
                name: name.to_string(),
                location: location.to_string(),
                networks,
                collected_at: Some(Utc::now()),
            });
        }

        if records.len() < amount as usize {
            warn!("Batch for {} ended after {} of {} scans", name, records.len(), amount);
        }
        Ok(records)
    }

    /// Ask the device for `amount` scans and return the printed log lines.
    ///
    /// Lines are returned unchanged until the device goes quiet for the read
    /// timeout or closes the stream.
    pub async fn capture_log(&mut self, amount: u32) -> Result<Vec<String>> {
        self.transport.send_command(&amount.to_string()).await?;

        let mut lines = Vec::new();
        while let Some(line) = self.next_line().await? {
            lines.push(line);
        }
        info!("Captured {} log lines for {} scans", lines.len(), amount);
        Ok(lines)
    }

    /// Next line, or `None` once the stream ends or the timeout passes.
    async fn next_line(&mut self) -> Result<Option<String>> {
        match time::timeout(self.read_timeout, self.transport.read_line()).await {
            Ok(line) => line,
            Err(_) => {
                debug!("No data for {:?}", self.read_timeout);
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::SerialLink;
    use fingerprint_core::error::FingerprintError;
    use std::collections::VecDeque;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    /// Scripted transport returning queued replies, then end of stream.
    #[derive(Default)]
    struct Scripted {
        sent: Vec<String>,
        replies: VecDeque<Result<Option<String>>>,
    }

    impl Scripted {
        fn with_lines(lines: &[&str]) -> Self {
            Self {
                sent: Vec::new(),
                replies: lines.iter().map(|l| Ok(Some(l.to_string()))).collect(),
            }
        }
    }

    impl LineTransport for Scripted {
        async fn send_command(&mut self, command: &str) -> Result<()> {
            self.sent.push(command.to_string());
            Ok(())
        }

        async fn read_line(&mut self) -> Result<Option<String>> {
            self.replies.pop_front().unwrap_or(Ok(None))
        }
    }

    const SCAN_A: &str = r#"[{"bssid":"AA","ssid":"eduroam","rssi":-40}]"#;
    const SCAN_B: &str = r#"[{"bssid":"AA","ssid":"eduroam","rssi":-44},{"bssid":"BB","ssid":"pf-gosl","rssi":-70}]"#;

    #[tokio::test]
    async fn test_scan_collects_requested_amount() {
        let transport = Scripted::with_lines(&[SCAN_A, SCAN_B, SCAN_A]);
        let mut driver = ScanDriver::new(transport, Duration::from_secs(1));

        let records = driver.scan("lab", "placeholder", 2).await.unwrap();

        assert_eq!(driver.transport_mut().sent, vec!["2".to_string()]);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "lab");
        assert_eq!(records[1].networks.len(), 2);
        assert!(records[0].collected_at.is_some());
        // Third line stays unread.
        assert_eq!(driver.transport_mut().replies.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_json_keeps_earlier_scans() {
        let transport = Scripted::with_lines(&[SCAN_A, "Guru Meditation Error", SCAN_B]);
        let mut driver = ScanDriver::new(transport, Duration::from_secs(1));

        let records = driver.scan("lab", "placeholder", 3).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].networks[0].rssi, -40);
    }

    #[tokio::test]
    async fn test_end_of_stream_ends_batch() {
        let transport = Scripted::with_lines(&[SCAN_A]);
        let mut driver = ScanDriver::new(transport, Duration::from_secs(1));
        assert_eq!(driver.scan("lab", "x", 3).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_transport_error_is_fatal() {
        let transport = Scripted {
            sent: Vec::new(),
            replies: VecDeque::from([Err(FingerprintError::Serial("unplugged".to_string()))]),
        };
        let mut driver = ScanDriver::new(transport, Duration::from_secs(1));
        assert!(matches!(
            driver.scan("lab", "x", 1).await.unwrap_err(),
            FingerprintError::Serial(_)
        ));
    }

    #[tokio::test]
    async fn test_silent_device_times_out() {
        let (client, _device) = tokio::io::duplex(256);
        let (read_half, write_half) = tokio::io::split(client);
        let link = SerialLink::new(BufReader::new(read_half), write_half);
        let mut driver = ScanDriver::new(link, Duration::from_millis(50));

        let records = driver.scan("lab", "x", 3).await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_scan_over_duplex_device() {
        let (client, device) = tokio::io::duplex(1024);
        let (read_half, write_half) = tokio::io::split(client);
        let link = SerialLink::new(BufReader::new(read_half), write_half);
        let mut driver = ScanDriver::new(link, Duration::from_secs(5));

        let firmware = tokio::spawn(async move {
            let (device_read, mut device_write) = tokio::io::split(device);
            let mut commands = BufReader::new(device_read).lines();
            let amount: usize = commands.next_line().await.unwrap().unwrap().parse().unwrap();
            for _ in 0..amount {
                device_write.write_all(SCAN_A.as_bytes()).await.unwrap();
                device_write.write_all(b"\r\n").await.unwrap();
            }
            amount
        });

        let records = driver.scan("lab", "placeholder", 2).await.unwrap();
        assert_eq!(firmware.await.unwrap(), 2);
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].networks[0].bssid, "AA");
    }

    #[tokio::test]
    async fn test_capture_log_reads_until_end() {
        let transport = Scripted::with_lines(&["scan number: 0", "AA - -40 - eduroam", ""]);
        let mut driver = ScanDriver::new(transport, Duration::from_secs(1));

        let lines = driver.capture_log(1).await.unwrap();
        assert_eq!(lines, vec!["scan number: 0", "AA - -40 - eduroam", ""]);
        assert_eq!(driver.transport_mut().sent, vec!["1".to_string()]);
    }
}
