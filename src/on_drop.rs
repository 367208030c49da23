//! 作用域退出时执行回调 (正常返回, `?` 提前返回或 panic 展开)

#[must_use = "`OnDrop` should be assigned to a variable, or it will be dropped immediately"]
pub struct OnDrop<F: FnOnce()>(Option<F>);

impl<F: FnOnce()> Drop for OnDrop<F> {
    fn drop(&mut self) {
        if let Some(cb) = self.0.take() {
            cb();
        }
    }
}

/// Returns a value that runs `cb` exactly once when dropped.
pub fn on_drop<F: FnOnce()>(cb: F) -> OnDrop<F> {
    OnDrop(Some(cb))
}
