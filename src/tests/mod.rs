mod common;

mod dispatch_isolation;
