//! Interactive collection loop.
//!
//! Prompts for a session name, scans it on the device, appends the scans to
//! the raw store and saves after every session, so an interrupted run loses at
//! most the session in progress.

use fingerprint_core::error::{FingerprintError, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::info;

use crate::raw_store::RawRecordStore;
use crate::scan_driver::ScanDriver;
use crate::transport::LineTransport;

/// Name that ends the loop.
pub const EXIT_COMMAND: &str = "exit";

/// Outcome of one collection run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectSummary {
    /// Session names scanned, in order.
    pub sessions: Vec<String>,
    /// Scans appended to the raw store.
    pub scans: usize,
}

pub struct Collector<T, I, O> {
    driver: ScanDriver<T>,
    store: RawRecordStore,
    location: String,
    scans_per_session: u32,
    input: I,
    output: O,
}

impl<T, I, O> Collector<T, I, O>
where
    T: LineTransport,
    I: AsyncBufRead + Unpin,
    O: AsyncWrite + Unpin,
{
    pub fn new(
        driver: ScanDriver<T>,
        store: RawRecordStore,
        location: impl Into<String>,
        scans_per_session: u32,
        input: I,
        output: O,
    ) -> Self {
        Self {
            driver,
            store,
            location: location.into(),
            scans_per_session,
            input,
            output,
        }
    }

    pub fn store(&self) -> &RawRecordStore {
        &self.store
    }

    /// Run until `exit` or end of input.
    pub async fn run(&mut self) -> Result<CollectSummary> {
        let mut summary = CollectSummary::default();

        loop {
            self.say("Enter name: ").await?;
            let mut name = String::new();
            if self.input.read_line(&mut name).await? == 0 {
                break;
            }
            let name = name.trim();

            if name == EXIT_COMMAND {
                break;
            }
            if name.is_empty() {
                self.say("Please enter a valid name.\nType 'exit' to quit.\n\n").await?;
                continue;
            }

            self.say(&format!("name: {}\n", name)).await?;
            let records = self
                .driver
                .scan(name, &self.location, self.scans_per_session)
                .await?;
            summary.scans += records.len();
            self.store.append(records);
            self.store.save()?;
            summary.sessions.push(name.to_string());

            self.say("Scanning complete.\nType 'exit' to quit.\n\n").await?;
        }

        info!(
            "Collected {} scans over {} sessions into {}",
            summary.scans,
            summary.sessions.len(),
            self.store.path().display()
        );
        Ok(summary)
    }

    async fn say(&mut self, text: &str) -> Result<()> {
        self.output.write_all(text.as_bytes()).await?;
        self.output.flush().await.map_err(FingerprintError::from)
    }
}
