use std::{sync::Arc, thread, time::Duration};

use re4ap_lib::bridge::{Bridge, ClientStatus};
use tracing::{debug, error, info, warn};

use crate::game_link::GameLink;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

pub struct BridgeWorker {
    bridge: Bridge,
    link: Arc<GameLink>,
    status: Option<ClientStatus>,
}

impl BridgeWorker {
    pub fn new(bridge: Bridge, link: Arc<GameLink>) -> Self {
        Self {
            bridge,
            link,
            status: None,
        }
    }

    pub fn status(&self) -> Option<ClientStatus> {
        self.status
    }

    fn update_status(&mut self) {
        let status = match self.bridge.read_status() {
            Ok(status) => status,
            Err(err) => {
                debug!("{}", err);
                return;
            }
        };
        if status == self.status {
            return;
        }
        match status {
            Some(status @ (ClientStatus::Refused | ClientStatus::Disconnected)) => {
                warn!("client status: {}", status)
            }
            Some(status) => info!("client status: {}", status),
            None => {}
        }
        self.status = status;
    }

    fn receive_items(&self) {
        match self.bridge.take_items() {
            Ok(items) if items.is_empty() => {}
            Ok(items) => {
                info!("received {} item(s): {:?}", items.len(), items);
                self.link.push_items(items);
            }
            Err(err) => error!("failed to read inbox: {}", err),
        }
    }

    fn send_locations(&self) {
        let locations = self.link.take_locations();
        if locations.is_empty() {
            return;
        }
        match self.bridge.append_locations(&locations) {
            Ok(()) => info!("checked location(s): {:?}", locations),
            Err(err) => {
                error!("failed to write outbox: {}", err);
                self.link.restore_locations(locations);
            }
        }
    }

    pub fn tick(&mut self) {
        self.update_status();
        self.receive_items();
        self.send_locations();
    }
}

pub fn spawn(bridge: Bridge, link: Arc<GameLink>) {
    info!("bridge directory: {}", bridge.dir().display());
    thread::spawn(move || {
        let mut worker = BridgeWorker::new(bridge, link);
        loop {
            worker.tick();
            thread::sleep(POLL_INTERVAL);
        }
    });
}

#[cfg(test)]
mod tests {
    use std::fs;

    use re4ap_lib::bridge::{INBOX_FILE, OUTBOX_FILE};

    use super::*;

    #[test]
    fn moves_items_in_and_locations_out() {
        let dir = tempfile::tempdir().unwrap();
        let bridge = Bridge::new(dir.path().to_path_buf());
        let link = Arc::new(GameLink::default());
        let mut worker = BridgeWorker::new(bridge.clone(), link.clone());

        bridge.append_items(&[4, 5]).unwrap();
        bridge.write_status(ClientStatus::Connected).unwrap();
        link.push_location(10099);
        worker.tick();

        assert_eq!(worker.status(), Some(ClientStatus::Connected));
        assert_eq!(link.drain_items(10), vec![4, 5]);
        assert!(!dir.path().join(INBOX_FILE).exists());
        assert_eq!(
            fs::read_to_string(dir.path().join(OUTBOX_FILE)).unwrap(),
            "10099"
        );

        link.push_location(3);
        worker.tick();
        assert_eq!(bridge.take_locations().unwrap(), vec![10099, 3]);
    }

    #[test]
    fn keeps_locations_when_the_outbox_is_unwritable() {
        let dir = tempfile::tempdir().unwrap();
        let bridge = Bridge::new(dir.path().join("missing"));
        let link = Arc::new(GameLink::default());
        let mut worker = BridgeWorker::new(bridge, link.clone());

        link.push_location(12);
        worker.tick();
        assert_eq!(worker.status(), None);
        assert_eq!(link.take_locations(), vec![12]);
    }
}
