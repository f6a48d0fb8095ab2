#[macro_export]
macro_rules! stats {
    (stats.$name:ident = $($items:tt)*) => {
        {
            let value = ($($items)*);
            let mut stats = $crate::stats::STATS.lock();
            stats.$name = value;
        }
    };
    (stats.$name:ident($($args:tt)*)) => {
        {
            let mut stats = $crate::stats::STATS.lock();
            stats.$name($($args)*);
        }
    };
    (stats.$name:ident $($items:tt)*) => {
        {
            let mut stats = $crate::stats::STATS.lock();
            stats.$name $($items)*;
        }
    };
}

#[macro_export]
macro_rules! get_stat {
    (stats.$name:ident) => {
        $crate::stats::STATS.lock().$name
    };
}
