//! 学生处理上下文
//!
//! 封装"我正在处理第几个学生"这一信息

use std::fmt::Display;

/// 学生处理上下文
#[derive(Debug, Clone)]
pub struct StudentCtx {
    /// 学生序号（从1开始，仅用于日志显示）
    pub index: usize,

    /// 学生总数
    pub total: usize,

    /// 学号
    pub student_id: String,
}

impl StudentCtx {
    /// 创建新的学生上下文
    pub fn new(index: usize, total: usize, student_id: String) -> Self {
        Self {
            index,
            total,
            student_id,
        }
    }
}

impl Display for StudentCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[学生 {}/{} ID#{}]", self.index, self.total, self.student_id)
    }
}
