use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// Identity of a child among its siblings.
///
/// Numbers and strings compare by value. [`Key::by_ref`] keys compare by
/// pointer, so any shared object can serve as a key without implementing
/// `Hash`.
#[derive(Clone)]
pub enum Key {
    Number(i64),
    Str(Rc<str>),
    Ref(Rc<dyn Any>),
}

impl Key {
    pub fn by_ref<T: 'static>(value: Rc<T>) -> Self {
        Key::Ref(value)
    }

    fn ref_addr(value: &Rc<dyn Any>) -> *const () {
        Rc::as_ptr(value) as *const ()
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Key::Number(a), Key::Number(b)) => a == b,
            (Key::Str(a), Key::Str(b)) => a == b,
            (Key::Ref(a), Key::Ref(b)) => Key::ref_addr(a) == Key::ref_addr(b),
            _ => false,
        }
    }
}

impl Eq for Key {}

impl Hash for Key {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Key::Number(n) => n.hash(state),
            Key::Str(s) => s.hash(state),
            Key::Ref(r) => Key::ref_addr(r).hash(state),
        }
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Number(n) => write!(f, "Key({n})"),
            Key::Str(s) => write!(f, "Key({s:?})"),
            Key::Ref(r) => write!(f, "Key({:p})", Key::ref_addr(r)),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Number(n) => write!(f, "{n}"),
            Key::Str(s) => f.write_str(s),
            Key::Ref(r) => write!(f, "{:p}", Key::ref_addr(r)),
        }
    }
}

impl From<i64> for Key {
    fn from(value: i64) -> Self {
        Key::Number(value)
    }
}

impl From<i32> for Key {
    fn from(value: i32) -> Self {
        Key::Number(i64::from(value))
    }
}

impl From<u32> for Key {
    fn from(value: u32) -> Self {
        Key::Number(i64::from(value))
    }
}

impl From<usize> for Key {
    fn from(value: usize) -> Self {
        Key::Number(value as i64)
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key::Str(value.into())
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Key::Str(value.into())
    }
}

impl From<Rc<str>> for Key {
    fn from(value: Rc<str>) -> Self {
        Key::Str(value)
    }
}
