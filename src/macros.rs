/// Build a leaf [`Element`](crate::Element).
///
/// `module!("F")` has no arguments; `module!("A"; x, y)` carries `x` and `y`.
#[macro_export]
macro_rules! module {
    ($id:expr) => {
        $crate::Element::Leaf($crate::Module::new($id))
    };
    ($id:expr; $($arg:expr),+ $(,)?) => {
        $crate::Element::Leaf($crate::Module::with_args($id, ::std::vec![$($arg),+]))
    };
}

/// Build a nested branch [`Element`](crate::Element) from its elements.
#[macro_export]
macro_rules! branch {
    ($($element:expr),* $(,)?) => {
        $crate::Element::Branch(::std::vec![$($element),*])
    };
}

/// Build a [`Forest`](crate::Forest) from its elements.
#[macro_export]
macro_rules! forest {
    ($($element:expr),* $(,)?) => {{
        let forest: $crate::Forest<_> = ::std::vec![$($element),*];
        forest
    }};
}
