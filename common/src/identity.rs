use log::{info, warn};
use uuid::{Builder, Uuid};

use crate::{error::StoreError, traits::ConfigStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    uuid: String,
}

impl DeviceIdentity {
    pub fn load_or_create(
        store: &mut dyn ConfigStore,
        entropy: impl FnOnce() -> [u8; 16],
    ) -> Result<Self, StoreError> {
        let mut record = store.load_device()?;

        if let Ok(stored) = Uuid::parse_str(&record.uuid) {
            let uuid = stored.hyphenated().to_string();
            if uuid != record.uuid {
                record.uuid = uuid.clone();
                store.save_device(&record)?;
            }
            info!("using stored device id {uuid}");
            return Ok(Self { uuid });
        }

        if !record.uuid.is_empty() {
            warn!("stored device id `{}` is not a uuid, replacing it", record.uuid);
        }
        let uuid = Builder::from_random_bytes(entropy())
            .into_uuid()
            .hyphenated()
            .to_string();
        record.uuid = uuid.clone();
        store.save_device(&record)?;
        info!("generated new device id {uuid}");
        Ok(Self { uuid })
    }

    pub fn as_str(&self) -> &str {
        &self.uuid
    }

    // Last 12 hex digits: AP SSID and registration name.
    pub fn short_id(&self) -> &str {
        &self.uuid[self.uuid.len() - 12..]
    }
}

impl std::fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.uuid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::DeviceRecord, testing::MemoryStore};
    use pretty_assertions::assert_eq;

    #[test]
    fn new_identity_is_a_version_4_uuid() {
        let mut store = MemoryStore::default();
        let identity = DeviceIdentity::load_or_create(&mut store, || [0xFF; 16]).unwrap();
        assert_eq!(identity.as_str(), "ffffffff-ffff-4fff-bfff-ffffffffffff");

        let mut store = MemoryStore::default();
        let identity = DeviceIdentity::load_or_create(&mut store, || [0x00; 16]).unwrap();
        assert_eq!(identity.as_str(), "00000000-0000-4000-8000-000000000000");
        assert_eq!(Uuid::parse_str(identity.as_str()).unwrap().get_version_num(), 4);
    }

    #[test]
    fn identity_is_generated_once_and_reused() {
        let mut store = MemoryStore::default();

        let first = DeviceIdentity::load_or_create(&mut store, || [0x11; 16]).unwrap();
        assert_eq!(store.device.uuid, first.as_str());

        let second = DeviceIdentity::load_or_create(&mut store, || {
            panic!("entropy must not be drawn for a stored identity")
        })
        .unwrap();
        assert_eq!(first, second);
        assert_eq!(second.short_id(), "111111111111");
    }

    #[test]
    fn malformed_stored_id_is_replaced() {
        let mut store = MemoryStore::default();
        store.device.uuid = "not-a-uuid".into();

        let identity = DeviceIdentity::load_or_create(&mut store, || [0xAB; 16]).unwrap();
        assert_eq!(identity.as_str(), "abababab-abab-4bab-abab-abababababab");
    }

    #[test]
    fn unreadable_record_keeps_stored_identity() {
        let mut store = MemoryStore::default();
        store.device = DeviceRecord {
            uuid: "11111111-1111-4111-9111-111111111111".into(),
            device_id: "11111111-1111-4111-9111-111111111111".into(),
        };
        store.fail_device_reads = true;

        let result = DeviceIdentity::load_or_create(&mut store, || [0x22; 16]);

        assert!(matches!(result, Err(StoreError::Backend(_))));
        assert_eq!(store.device.uuid, "11111111-1111-4111-9111-111111111111");
        assert_eq!(store.device.device_id, "11111111-1111-4111-9111-111111111111");
    }

    #[test]
    fn uppercase_stored_id_is_normalized_not_regenerated() {
        let mut store = MemoryStore::default();
        store.device.uuid = "ABABABAB-ABAB-4BAB-ABAB-ABABABABABAB".into();

        let identity = DeviceIdentity::load_or_create(&mut store, || {
            panic!("entropy must not be drawn for a stored identity")
        })
        .unwrap();

        assert_eq!(identity.as_str(), "abababab-abab-4bab-abab-abababababab");
        assert_eq!(store.device.uuid, identity.as_str());
    }
}
