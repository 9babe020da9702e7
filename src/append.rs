/// Values that `ConcurrentMap::add_if_present` can grow in place.
///
/// `append_value` receives the incoming value whole. An implementation either
/// folds it into `self` or returns `false` to reject it, in which case
/// `self` must be left untouched.
pub trait Append {
    /// Fold `value` into `self`. Returns `false` if `self` is not a sequence.
    fn append_value(&mut self, value: Self) -> bool;
}

impl<T> Append for Vec<T> {
    fn append_value(&mut self, value: Self) -> bool {
        self.extend(value);
        true
    }
}

/// Arrays receive the incoming value as a single new element; any other
/// stored JSON value rejects the append.
impl Append for serde_json::Value {
    fn append_value(&mut self, value: Self) -> bool {
        match self {
            serde_json::Value::Array(items) => {
                items.push(value);
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn vec_extends() {
        let mut v = vec![1, 2];
        assert!(v.append_value(vec![3]));
        assert_eq!(v, vec![1, 2, 3]);
    }

    #[test]
    fn json_array_pushes_whole_value() {
        let mut v = json!(["dolphin"]);
        assert!(v.append_value(json!(["whale"])));
        assert_eq!(v, json!(["dolphin", ["whale"]]));
    }

    #[test]
    fn json_scalar_rejects_and_is_untouched() {
        let mut v = json!("dolphin");
        assert!(!v.append_value(json!("whale")));
        assert_eq!(v, json!("dolphin"));
    }
}
