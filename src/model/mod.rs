use std::{
    borrow::{Borrow, BorrowMut},
    hash::Hash,
};

pub mod grid;
pub mod job;
pub mod order;
pub mod placement;

/// Keyed model state goes through `MapType` so iteration order is fixed;
/// reproducibility of the simulator depends on it.
pub type MapType<K, V> = std::collections::BTreeMap<K, V>;

pub trait Map<K, V>: BorrowMut<MapType<K, V>> + Into<MapType<K, V>>
where
    K: Eq + Ord + 'static,
    V: 'static,
{
    fn gets<Q>(&self, key: &Q) -> &V
    where
        K: Borrow<Q> + Ord,
        Q: ?Sized + Hash + Eq + Ord,
    {
        self.borrow().get(key).expect("unchecked get failed")
    }

    fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q> + Ord,
        Q: ?Sized + Hash + Eq + Ord,
    {
        self.borrow().get(key)
    }

    fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.borrow().iter()
    }

    fn keys(&self) -> impl Iterator<Item = &K> {
        self.borrow().keys()
    }

    fn values(&self) -> impl Iterator<Item = &V> {
        self.borrow().values()
    }

    fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q> + Ord,
        Q: ?Sized + Hash + Eq + Ord,
    {
        self.borrow().contains_key(key)
    }

    fn insert(&mut self, key: K, value: V) {
        self.borrow_mut().insert(key, value);
    }

    fn len(&self) -> usize {
        self.borrow().len()
    }

    fn is_empty(&self) -> bool {
        self.borrow().is_empty()
    }
}

#[macro_export]
macro_rules! define_map {
    ($key:ty, $value:ty, $base:ident) => {
        #[derive(Debug, Default, Clone)]
        pub struct $base($crate::model::MapType<$key, $value>);

        impl std::borrow::Borrow<$crate::model::MapType<$key, $value>> for $base {
            fn borrow(&self) -> &$crate::model::MapType<$key, $value> {
                &self.0
            }
        }

        impl std::borrow::BorrowMut<$crate::model::MapType<$key, $value>> for $base {
            fn borrow_mut(&mut self) -> &mut $crate::model::MapType<$key, $value> {
                &mut self.0
            }
        }

        impl $crate::model::Map<$key, $value> for $base {}

        impl From<$crate::model::MapType<$key, $value>> for $base {
            fn from(map: $crate::model::MapType<$key, $value>) -> Self {
                Self(map)
            }
        }

        impl From<$base> for $crate::model::MapType<$key, $value> {
            fn from(base: $base) -> Self {
                base.0
            }
        }

        impl IntoIterator for $base {
            type Item = ($key, $value);
            type IntoIter =
                <$crate::model::MapType<$key, $value> as std::iter::IntoIterator>::IntoIter;

            fn into_iter(self) -> Self::IntoIter {
                self.0.into_iter()
            }
        }
    };
}
