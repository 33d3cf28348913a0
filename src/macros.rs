pub use enclose::*;

/// Builds a compute function for [`NodeTemplate::new`](crate::NodeTemplate::new).
///
/// The optional leading group lists values to clone into the closure,
/// with the same syntax as [`enclose!`].
#[macro_export]
macro_rules! compute {
    (( $($d_tt:tt)* ) $inputs:ident => $($b:tt)*) => {
        $crate::macros::enclose!(($( $d_tt )*) move |$inputs| { $($b)* })
    };
    ($inputs:ident => $($b:tt)*) => {
        move |$inputs| { $($b)* }
    };
}
