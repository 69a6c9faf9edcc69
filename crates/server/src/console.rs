//! Operator console
//!
//! Line-oriented menu for dialing customers while the webhook server runs.

use std::io;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use loan_advisor_core::CustomerDirectory;
use loan_advisor_telephony::Dialer;

/// Why the console stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleExit {
    /// Operator chose to leave
    Quit,
    /// Input stream closed
    InputClosed,
}

pub struct Console<R, W> {
    input: R,
    output: W,
    directory: Arc<dyn CustomerDirectory>,
    dialer: Option<Arc<dyn Dialer>>,
}

impl<R, W> Console<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(
        input: R,
        output: W,
        directory: Arc<dyn CustomerDirectory>,
        dialer: Option<Arc<dyn Dialer>>,
    ) -> Self {
        Self {
            input,
            output,
            directory,
            dialer,
        }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    /// Run the menu until the operator exits or input closes
    pub async fn run(&mut self) -> io::Result<ConsoleExit> {
        loop {
            let phone = match self.select_customer().await? {
                Ok(phone) => phone,
                Err(exit) => return Ok(exit),
            };

            self.dial(&phone).await?;

            self.say(&format!("\n{}", "=".repeat(50))).await?;
            let another = match self.prompt("Would you like to make another call? (y/n): ").await? {
                Some(answer) => answer.to_lowercase(),
                None => return Ok(ConsoleExit::InputClosed),
            };
            if another != "y" && another != "yes" {
                return Ok(ConsoleExit::Quit);
            }
        }
    }

    /// Show the menu until a known customer is entered
    async fn select_customer(&mut self) -> io::Result<Result<String, ConsoleExit>> {
        loop {
            self.say("\nOptions:").await?;
            self.say("1. Make an outbound call to a customer").await?;
            self.say("9. Exit").await?;

            let choice = match self.prompt("\nSelect an option (1 or 9): ").await? {
                Some(choice) => choice,
                None => return Ok(Err(ConsoleExit::InputClosed)),
            };

            match choice.as_str() {
                "1" => {
                    let phone = match self
                        .prompt("Enter customer phone number (e.g., +1234567890): ")
                        .await?
                    {
                        Some(phone) => phone,
                        None => return Ok(Err(ConsoleExit::InputClosed)),
                    };

                    if self.directory.contains(&phone) {
                        return Ok(Ok(phone));
                    }
                    self.say(&format!("Customer not found for phone number: {}", phone))
                        .await?;
                }
                "9" => {
                    self.say("Goodbye!").await?;
                    return Ok(Err(ConsoleExit::Quit));
                }
                _ => self.say("Invalid option. Please select 1 or 9.").await?,
            }
        }
    }

    async fn dial(&mut self, phone: &str) -> io::Result<()> {
        let name = self
            .directory
            .get(phone)
            .map(|c| c.full_name)
            .unwrap_or_default();
        self.say(&format!("\nInitiating outbound call to {} ({})", name, phone))
            .await?;

        let dialer = match &self.dialer {
            Some(dialer) => Arc::clone(dialer),
            None => {
                return self
                    .say("Failed to initiate call: Twilio credentials are not configured.")
                    .await;
            }
        };

        match dialer.place_call(phone).await {
            Ok(call_sid) => {
                self.say(&format!("Call initiated successfully! (SID: {})", call_sid))
                    .await?;
                self.say("The advisor will start the conversation when the call is answered.")
                    .await
            }
            Err(e) => {
                tracing::error!(phone = %phone, error = %e, "Console dial failed");
                self.say(&format!("Failed to initiate call: {}", e)).await
            }
        }
    }

    async fn say(&mut self, line: &str) -> io::Result<()> {
        self.output.write_all(line.as_bytes()).await?;
        self.output.write_all(b"\n").await?;
        self.output.flush().await
    }

    /// Print `text` and read one trimmed line; `None` at end of input
    async fn prompt(&mut self, text: &str) -> io::Result<Option<String>> {
        self.output.write_all(text.as_bytes()).await?;
        self.output.flush().await?;

        let mut line = String::new();
        if self.input.read_line(&mut line).await? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::directory;
    use async_trait::async_trait;
    use loan_advisor_telephony::TelephonyError;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingDialer {
        dialed: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Dialer for RecordingDialer {
        async fn place_call(&self, to: &str) -> Result<String, TelephonyError> {
            self.dialed.lock().push(to.to_string());
            Ok(format!("CA{}", self.dialed.lock().len()))
        }
    }

    async fn run(input: &'static [u8], dialer: Option<Arc<dyn Dialer>>) -> (ConsoleExit, String) {
        let mut console = Console::new(input, Vec::new(), directory(), dialer);
        let exit = console.run().await.unwrap();
        (exit, String::from_utf8(console.into_output()).unwrap())
    }

    #[tokio::test]
    async fn test_exit_option() {
        let (exit, output) = run(b"9\n", None).await;
        assert_eq!(exit, ConsoleExit::Quit);
        assert!(output.contains("Goodbye!"));
    }

    #[tokio::test]
    async fn test_invalid_option() {
        let (exit, output) = run(b"5\n9\n", None).await;
        assert_eq!(exit, ConsoleExit::Quit);
        assert!(output.contains("Invalid option. Please select 1 or 9."));
    }

    #[tokio::test]
    async fn test_unknown_customer_returns_to_menu() {
        let (exit, output) = run(b"1\n+10000000000\n", None).await;
        assert_eq!(exit, ConsoleExit::InputClosed);
        assert!(output.contains("Customer not found for phone number: +10000000000"));
    }

    #[tokio::test]
    async fn test_dial_twice() {
        let dialer = Arc::new(RecordingDialer::default());
        let (exit, output) = run(
            b"1\n+1234567891\ny\n1\n+1234567892\nno\n",
            Some(dialer.clone() as Arc<dyn Dialer>),
        )
        .await;

        assert_eq!(exit, ConsoleExit::Quit);
        assert_eq!(*dialer.dialed.lock(), vec!["+1234567891", "+1234567892"]);
        assert!(output.contains("Initiating outbound call to Sarah Johnson (+1234567891)"));
        assert!(output.contains("Call initiated successfully! (SID: CA2)"));
    }

    #[tokio::test]
    async fn test_dial_without_credentials() {
        let (exit, output) = run(b"1\n+1234567891\nn\n", None).await;
        assert_eq!(exit, ConsoleExit::Quit);
        assert!(output.contains("Failed to initiate call"));
    }
}
