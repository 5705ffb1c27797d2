//! 错误报告
//!
//! 核心在操作边界捕获的错误都交给 [`ErrorReporter`]，自身从不向外抛出。

use std::error::Error;

/// 错误报告协作者
pub trait ErrorReporter {
    /// 记录一个已被恢复的错误
    fn report(&mut self, context: &str, error: &dyn Error);

    /// 向用户显示一条非阻塞提示
    fn warn_user(&mut self, message: &str);
}

/// 转发到 tracing 的默认实现
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&mut self, context: &str, error: &dyn Error) {
        tracing::error!("{}: {}", context, error);
    }

    fn warn_user(&mut self, message: &str) {
        tracing::warn!("{}", message);
    }
}

/// 把错误和提示保存在内存中，供界面轮询显示
#[derive(Debug, Default, Clone)]
pub struct RecordingReporter {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// 取出所有用户提示
    pub fn take_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
    }
}

impl ErrorReporter for RecordingReporter {
    fn report(&mut self, context: &str, error: &dyn Error) {
        tracing::debug!("{}: {}", context, error);
        self.errors.push(format!("{}: {}", context, error));
    }

    fn warn_user(&mut self, message: &str) {
        self.warnings.push(message.to_string());
    }
}
