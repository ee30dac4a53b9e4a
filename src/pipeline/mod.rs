pub(crate) mod feature;
