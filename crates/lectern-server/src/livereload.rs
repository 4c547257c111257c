//! WebSocket-based live reload.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Path of the reload WebSocket endpoint.
pub const SOCKET_PATH: &str = "/__livereload";

/// Path of the client script injected into pages.
pub const SCRIPT_PATH: &str = "/__livereload.js";

/// Messages sent to connected browsers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReloadMessage {
    /// Full page reload
    Reload,

    /// Connection established
    Connected,
}

/// Hub for broadcasting reload messages to all connected clients.
#[derive(Debug, Clone)]
pub struct ReloadHub {
    sender: broadcast::Sender<ReloadMessage>,
}

impl ReloadHub {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(16);
        Self { sender }
    }

    /// Send a message to all connected clients.
    pub fn send(&self, msg: ReloadMessage) {
        // No receivers is fine: nobody has a page open.
        let _ = self.sender.send(msg);
    }

    /// Ask every connected browser to reload.
    pub fn reload(&self) {
        tracing::debug!("Reloading {} clients", self.subscriber_count());
        self.send(ReloadMessage::Reload);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadMessage> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ReloadHub {
    fn default() -> Self {
        Self::new()
    }
}

/// The `<script>` tag injected into served pages.
pub fn script_tag() -> String {
    format!(r#"<script src="{}"></script>"#, SCRIPT_PATH)
}

/// Insert the client script before the last `</body>`, or append it.
pub fn inject_script(html: &str) -> String {
    let tag = script_tag();
    match html.to_ascii_lowercase().rfind("</body>") {
        Some(pos) => format!("{}{}\n{}", &html[..pos], tag, &html[pos..]),
        None => format!("{}\n{}", html, tag),
    }
}

/// Client-side live reload script.
///
/// Connects back to whatever host served the page, so it keeps working
/// when the server fell back to another port.
pub fn client_script() -> String {
    format!(
        r#"
(function() {{
  'use strict';

  var scheme = location.protocol === 'https:' ? 'wss://' : 'ws://';
  var retries = 0;

  function connect() {{
    var ws = new WebSocket(scheme + location.host + '{}');

    ws.onopen = function() {{
      retries = 0;
    }};

    ws.onmessage = function(event) {{
      var msg = JSON.parse(event.data);
      if (msg.type === 'reload') {{
        location.reload();
      }} else if (msg.type === 'connected') {{
        console.log('[lectern] live reload connected');
      }}
    }};

    ws.onclose = function() {{
      if (retries < 10) {{
        retries++;
        setTimeout(connect, 1000 * retries);
      }}
    }};
  }}

  connect();
}})();
"#,
        SOCKET_PATH
    )
}
