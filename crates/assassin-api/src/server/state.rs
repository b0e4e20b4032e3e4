#[derive(Clone)]
struct AppState {
    engine: std::sync::Arc<Mutex<GameEngine>>,
    stream_tx: broadcast::Sender<StreamMessage>,
}

impl AppState {
    fn open(sqlite_path: impl AsRef<FsPath>, config: EngineConfig) -> Result<Self, ServerError> {
        let store = GameStore::open(sqlite_path)?;
        Ok(Self::with_store(store, config))
    }

    fn with_store(store: GameStore, config: EngineConfig) -> Self {
        let (stream_tx, _) = broadcast::channel(1024);
        let sink = BroadcastSink {
            stream_tx: stream_tx.clone(),
        };
        let engine = GameEngine::with_config(store, Box::new(sink), config);
        Self {
            engine: std::sync::Arc::new(Mutex::new(engine)),
            stream_tx,
        }
    }
}

/// Routes outbound game messages onto the websocket fan-out. A send with no
/// connected listeners is not a delivery failure.
struct BroadcastSink {
    stream_tx: broadcast::Sender<StreamMessage>,
}

impl NotificationSink for BroadcastSink {
    fn notify(&self, account_id: i64, message: &str) -> Result<(), NotifySendError> {
        let _ = self.stream_tx.send(StreamMessage::direct(account_id, message));
        Ok(())
    }

    fn announce(&self, chat_id: i64, message: &str) -> Result<(), NotifySendError> {
        let _ = self
            .stream_tx
            .send(StreamMessage::announcement(chat_id, message));
        Ok(())
    }
}
