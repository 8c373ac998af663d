//! Device registry capability
//!
//! Enumerating controllers and reacting to hot-plug belongs to the platform
//! layer. The core only consumes this interface.

use std::fmt;

/// Opaque, registry-assigned device identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId(pub usize);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub id: DeviceId,
    pub name: String,
    pub vendor_id: Option<u16>,
    pub product_id: Option<u16>,
}

impl DeviceInfo {
    /// `"{name} ({VID}:{PID})"` with ids as four hex digits
    pub fn display_string(&self) -> String {
        format!(
            "{} ({:04X}:{:04X})",
            self.name,
            self.vendor_id.unwrap_or(0),
            self.product_id.unwrap_or(0)
        )
    }
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    Added(DeviceInfo),
    Removed(DeviceInfo),
}

pub type DeviceCallback = Box<dyn FnMut(&DeviceInfo)>;

pub trait DeviceRegistry {
    /// Devices connected right now, in a stable order
    fn list_devices(&self) -> Vec<DeviceInfo>;

    fn on_device_added(&mut self, callback: DeviceCallback);

    fn on_device_removed(&mut self, callback: DeviceCallback);
}

/// Callback lists shared by registry implementations
#[derive(Default)]
pub struct DeviceCallbacks {
    added: Vec<DeviceCallback>,
    removed: Vec<DeviceCallback>,
}

impl DeviceCallbacks {
    pub fn push_added(&mut self, callback: DeviceCallback) {
        self.added.push(callback);
    }

    pub fn push_removed(&mut self, callback: DeviceCallback) {
        self.removed.push(callback);
    }

    pub fn dispatch(&mut self, event: &DeviceEvent) {
        let (callbacks, info) = match event {
            DeviceEvent::Added(info) => (&mut self.added, info),
            DeviceEvent::Removed(info) => (&mut self.removed, info),
        };
        for callback in callbacks.iter_mut() {
            callback(info);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn info(id: usize) -> DeviceInfo {
        DeviceInfo {
            id: DeviceId(id),
            name: "IIDX Entry model".to_string(),
            vendor_id: Some(0x1ccf),
            product_id: Some(0x8048),
        }
    }

    #[test]
    fn display_string_pads_hex_ids() {
        assert_eq!(info(0).display_string(), "IIDX Entry model (1CCF:8048)");

        let unknown = DeviceInfo {
            vendor_id: None,
            product_id: Some(0xa),
            ..info(1)
        };
        assert_eq!(unknown.to_string(), "IIDX Entry model (0000:000A)");
    }

    #[test]
    fn callbacks_receive_matching_events_only() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut callbacks = DeviceCallbacks::default();

        let added = seen.clone();
        callbacks.push_added(Box::new(move |d| added.borrow_mut().push(("added", d.id))));
        let removed = seen.clone();
        callbacks.push_removed(Box::new(move |d| {
            removed.borrow_mut().push(("removed", d.id))
        }));

        callbacks.dispatch(&DeviceEvent::Added(info(3)));
        callbacks.dispatch(&DeviceEvent::Removed(info(3)));
        callbacks.dispatch(&DeviceEvent::Added(info(4)));

        assert_eq!(
            *seen.borrow(),
            vec![
                ("added", DeviceId(3)),
                ("removed", DeviceId(3)),
                ("added", DeviceId(4)),
            ]
        );
    }
}
