use crate::map::ConcurrentMap;
use serde::ser::{Serialize, SerializeMap, Serializer};

/// Serializes as one flat map built from a buffered snapshot. Key order is
/// unspecified; every key appears exactly once.
impl<V> Serialize for ConcurrentMap<V>
where
    V: Serialize + Send + Sync,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let snapshot = self.iter_buffered();
        let mut map = serializer.serialize_map(Some(snapshot.len()))?;
        for (key, value) in snapshot {
            map.serialize_entry(&key, &*value)?;
        }
        map.end()
    }
}
