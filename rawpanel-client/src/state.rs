//! Cached panel identity and availability.

use parking_lot::RwLock;
use rawpanel_protocol::message::OutboundMessage;
use std::collections::HashMap;

#[derive(Debug, Default)]
struct StateInner {
    model: String,
    serial: String,
    name: String,
    topology_json: String,
    topology_svg: String,
    hwc_availability: HashMap<u32, u32>,
}

/// Last-known panel identity, topology and HWC availability.
///
/// Written by the session's dispatcher task as updates arrive, read from
/// arbitrary caller threads. Reads vastly outnumber writes, hence the
/// reader-writer lock.
#[derive(Debug, Default)]
pub struct PanelState {
    inner: RwLock<StateInner>,
}

impl PanelState {
    pub fn model(&self) -> String {
        self.inner.read().model.clone()
    }

    pub fn serial(&self) -> String {
        self.inner.read().serial.clone()
    }

    pub fn name(&self) -> String {
        self.inner.read().name.clone()
    }

    /// The panel's topology JSON, opaque to this crate.
    pub fn topology_json(&self) -> String {
        self.inner.read().topology_json.clone()
    }

    /// The panel's base SVG, opaque to this crate.
    pub fn topology_svg(&self) -> String {
        self.inner.read().topology_svg.clone()
    }

    /// Enabled/mapped flag per hardware component ID.
    pub fn hwc_availability(&self) -> HashMap<u32, u32> {
        self.inner.read().hwc_availability.clone()
    }

    /// True once every identity field required for initialization has
    /// arrived: model, serial, name and both topology blobs.
    pub fn is_initialized(&self) -> bool {
        let inner = self.inner.read();
        !inner.model.is_empty()
            && !inner.serial.is_empty()
            && !inner.name.is_empty()
            && !inner.topology_json.is_empty()
            && !inner.topology_svg.is_empty()
    }

    /// Folds one message from the panel into the cache.
    pub(crate) fn apply(&self, msg: &OutboundMessage) {
        let mut inner = self.inner.write();
        if let Some(info) = &msg.panel_info {
            if !info.model.is_empty() {
                inner.model = info.model.clone();
            }
            if !info.serial.is_empty() {
                inner.serial = info.serial.clone();
            }
            if !info.name.is_empty() {
                inner.name = info.name.clone();
            }
        }
        if let Some(topology) = &msg.panel_topology {
            if !topology.json.is_empty() {
                inner.topology_json = topology.json.clone();
            }
            if !topology.svgbase.is_empty() {
                inner.topology_svg = topology.svgbase.clone();
            }
        }
        for (&id, &mapped) in &msg.hwc_availability {
            inner.hwc_availability.insert(id, mapped);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rawpanel_protocol::message::{PanelInfo, PanelTopology};

    #[test]
    fn test_initialization_requires_all_identity_fields() {
        let state = PanelState::default();
        assert!(!state.is_initialized());

        state.apply(&OutboundMessage {
            panel_info: Some(PanelInfo {
                model: "Mock".to_string(),
                serial: "4029".to_string(),
                name: "Unit".to_string(),
                ..Default::default()
            }),
            ..Default::default()
        });
        assert!(!state.is_initialized());

        state.apply(&OutboundMessage {
            panel_topology: Some(PanelTopology {
                json: "{}".to_string(),
                svgbase: "<svg/>".to_string(),
            }),
            ..Default::default()
        });
        assert!(state.is_initialized());
        assert_eq!(state.model(), "Mock");
    }

    #[test]
    fn test_availability_merges() {
        let state = PanelState::default();
        let mut msg = OutboundMessage::default();
        msg.hwc_availability.insert(1, 1);
        state.apply(&msg);

        let mut msg = OutboundMessage::default();
        msg.hwc_availability.insert(2, 0);
        state.apply(&msg);

        let availability = state.hwc_availability();
        assert_eq!(availability.get(&1), Some(&1));
        assert_eq!(availability.get(&2), Some(&0));
    }
}
