//! TwiML builder
//!
//! Produces the XML documents returned from voice webhooks.

use std::fmt::Write;

/// Builder for TwiML responses
#[derive(Debug, Clone, Default)]
pub struct TwimlBuilder {
    elements: Vec<TwimlElement>,
}

#[derive(Debug, Clone)]
enum TwimlElement {
    Say {
        text: String,
        voice: String,
        language: String,
    },
    Gather {
        action: String,
        method: String,
        timeout: u32,
        speech_timeout: String,
        language: Option<String>,
        children: Vec<TwimlElement>,
    },
    Pause {
        length: u32,
    },
    Redirect {
        url: String,
        method: String,
    },
    Hangup,
}

impl TwimlBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a `<Say>` (text-to-speech)
    pub fn say(mut self, text: &str, voice: &str, language: &str) -> Self {
        self.elements.push(TwimlElement::Say {
            text: xml_escape(text),
            voice: xml_escape(voice),
            language: xml_escape(language),
        });
        self
    }

    /// Add a speech `<Gather>` posting the transcript to `action`
    ///
    /// `speechTimeout` is always `auto`. An optional prompt is spoken
    /// inside the gather so the caller can barge in.
    pub fn gather_speech(
        mut self,
        action: &str,
        timeout: u32,
        language: Option<&str>,
        prompt: Option<(&str, &str)>,
    ) -> Self {
        let children = match prompt {
            Some((text, voice)) => vec![TwimlElement::Say {
                text: xml_escape(text),
                voice: xml_escape(voice),
                language: xml_escape(language.unwrap_or("en-US")),
            }],
            None => Vec::new(),
        };

        self.elements.push(TwimlElement::Gather {
            action: xml_escape(action),
            method: "POST".to_string(),
            timeout,
            speech_timeout: "auto".to_string(),
            language: language.map(xml_escape),
            children,
        });
        self
    }

    pub fn pause(mut self, seconds: u32) -> Self {
        self.elements.push(TwimlElement::Pause { length: seconds });
        self
    }

    pub fn redirect(mut self, url: &str) -> Self {
        self.elements.push(TwimlElement::Redirect {
            url: xml_escape(url),
            method: "POST".to_string(),
        });
        self
    }

    pub fn hangup(mut self) -> Self {
        self.elements.push(TwimlElement::Hangup);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Render the document
    pub fn build(self) -> String {
        let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<Response>\n");

        for element in &self.elements {
            render_element(&mut xml, element, 1);
        }

        xml.push_str("</Response>");
        xml
    }
}

fn render_element(xml: &mut String, element: &TwimlElement, indent: usize) {
    let pad = "  ".repeat(indent);

    match element {
        TwimlElement::Say {
            text,
            voice,
            language,
        } => {
            let _ = writeln!(
                xml,
                "{}<Say voice=\"{}\" language=\"{}\">{}</Say>",
                pad, voice, language, text
            );
        }
        TwimlElement::Gather {
            action,
            method,
            timeout,
            speech_timeout,
            language,
            children,
        } => {
            let _ = write!(
                xml,
                "{}<Gather input=\"speech\" action=\"{}\" method=\"{}\" timeout=\"{}\" speechTimeout=\"{}\"",
                pad, action, method, timeout, speech_timeout
            );
            if let Some(lang) = language {
                let _ = write!(xml, " language=\"{}\"", lang);
            }

            if children.is_empty() {
                let _ = writeln!(xml, "/>");
            } else {
                let _ = writeln!(xml, ">");
                for child in children {
                    render_element(xml, child, indent + 1);
                }
                let _ = writeln!(xml, "{}</Gather>", pad);
            }
        }
        TwimlElement::Pause { length } => {
            let _ = writeln!(xml, "{}<Pause length=\"{}\"/>", pad, length);
        }
        TwimlElement::Redirect { url, method } => {
            let _ = writeln!(xml, "{}<Redirect method=\"{}\">{}</Redirect>", pad, method, url);
        }
        TwimlElement::Hangup => {
            let _ = writeln!(xml, "{}<Hangup/>", pad);
        }
    }
}

/// Escape XML special characters
pub fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_say_then_gather() {
        let twiml = TwimlBuilder::new()
            .say("Hello, are we speaking with Sarah Johnson?", "alice", "en-US")
            .gather_speech("https://example.ngrok.io/voice/process", 10, None, None)
            .say("I didn't hear anything. Let me try again.", "alice", "en-US")
            .redirect("https://example.ngrok.io/voice/process")
            .build();

        assert!(twiml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<Response>\n"));
        assert!(twiml.ends_with("</Response>"));
        assert!(twiml.contains(
            "<Say voice=\"alice\" language=\"en-US\">Hello, are we speaking with Sarah Johnson?</Say>"
        ));
        assert!(twiml.contains(
            "<Gather input=\"speech\" action=\"https://example.ngrok.io/voice/process\" \
             method=\"POST\" timeout=\"10\" speechTimeout=\"auto\"/>"
        ));
        assert!(twiml.contains(
            "<Redirect method=\"POST\">https://example.ngrok.io/voice/process</Redirect>"
        ));

        let say = twiml.find("<Say").unwrap();
        let gather = twiml.find("<Gather").unwrap();
        let redirect = twiml.find("<Redirect").unwrap();
        assert!(say < gather && gather < redirect);
    }

    #[test]
    fn test_gather_with_prompt() {
        let twiml = TwimlBuilder::new()
            .gather_speech("/voice/process", 5, Some("en-GB"), Some(("Go ahead", "alice")))
            .build();
        assert!(twiml.contains("language=\"en-GB\">"));
        assert!(twiml.contains("    <Say voice=\"alice\" language=\"en-GB\">Go ahead</Say>"));
        assert!(twiml.contains("  </Gather>"));
    }

    #[test]
    fn test_hangup_and_pause() {
        let twiml = TwimlBuilder::new()
            .say("Thank you for your time. Goodbye!", "alice", "en-US")
            .pause(1)
            .hangup()
            .build();
        assert!(twiml.contains("<Pause length=\"1\"/>"));
        assert!(twiml.contains("<Hangup/>"));
    }

    #[test]
    fn test_text_is_escaped() {
        let twiml = TwimlBuilder::new()
            .say("Fees & charges <waived> for \"you\"", "alice", "en-US")
            .build();
        assert!(twiml.contains("Fees &amp; charges &lt;waived&gt; for &quot;you&quot;"));
        assert_eq!(xml_escape("it's"), "it&apos;s");
    }

    #[test]
    fn test_redirect_url_escaped() {
        let twiml = TwimlBuilder::new().redirect("/voice/process?a=1&b=2").build();
        assert!(twiml.contains("/voice/process?a=1&amp;b=2"));
    }
}
