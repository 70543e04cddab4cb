//! Session 指标收集模块
//!
//! 记录 actor 生命周期、帧渲染和菜单命令的计数器，
//! 并在内存中聚合一份会话摘要。

use metrics::counter;

/// 记录 actor 创建
pub fn record_actor_spawned(kind: &str) {
    counter!("carla_control_actors_spawned_total", "kind" => kind.to_string()).increment(1);
}

/// 记录 actor 销毁
pub fn record_actor_destroyed(count: usize) {
    counter!("carla_control_actors_destroyed_total").increment(count as u64);
}

/// 记录一帧已呈现到显示面
pub fn record_frame_rendered() {
    counter!("carla_control_frames_rendered_total").increment(1);
}

/// 记录一帧因队列已满被丢弃
pub fn record_frame_dropped() {
    counter!("carla_control_frames_dropped_total").increment(1);
}

/// 记录因控制队列已满而跳过的一帧控制量
pub fn record_control_skipped() {
    counter!("carla_control_controls_skipped_total").increment(1);
}

/// 记录菜单命令
pub fn record_menu_command(command: &str) {
    counter!("carla_control_menu_commands_total", "command" => command.to_string()).increment(1);
}

/// 会话指标聚合器
///
/// 在内存中聚合计数，退出时输出摘要。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionMetricsAggregator {
    pub vehicles_spawned: u64,
    pub pedestrians_spawned: u64,
    pub actors_destroyed: u64,
    pub destroy_failures: u64,
    pub frames_rendered: u64,
    pub frames_dropped: u64,
    /// 控制泵繁忙时跳过的控制量
    pub controls_skipped: u64,
    pub commands: u64,
    /// 被识别但执行失败的命令
    pub failed_commands: u64,
}

impl SessionMetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vehicle_spawned(&mut self) {
        self.vehicles_spawned += 1;
        record_actor_spawned("vehicle");
        record_actor_spawned("camera");
    }

    pub fn pedestrian_spawned(&mut self) {
        self.pedestrians_spawned += 1;
        record_actor_spawned("pedestrian");
    }

    pub fn teardown(&mut self, destroyed: usize, failed: usize) {
        self.actors_destroyed += destroyed as u64;
        self.destroy_failures += failed as u64;
        record_actor_destroyed(destroyed);
    }

    pub fn command(&mut self, command: &str, success: bool) {
        self.commands += 1;
        if !success {
            self.failed_commands += 1;
        }
        record_menu_command(command);
    }

    pub fn controls_skipped(&mut self, skipped: u64) {
        self.controls_skipped += skipped;
    }

    /// 合并显示线程的帧计数
    pub fn set_frames(&mut self, rendered: u64, dropped: u64) {
        self.frames_rendered = rendered;
        self.frames_dropped = dropped;
    }
}

impl std::fmt::Display for SessionMetricsAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Session Summary ===")?;
        writeln!(
            f,
            "Commands: {} ({} failed)",
            self.commands, self.failed_commands
        )?;
        writeln!(
            f,
            "Spawned: {} vehicles, {} pedestrians",
            self.vehicles_spawned, self.pedestrians_spawned
        )?;
        writeln!(
            f,
            "Destroyed: {} actors ({} failed)",
            self.actors_destroyed, self.destroy_failures
        )?;
        write!(
            f,
            "Frames: {} rendered, {} dropped ({} controls skipped)",
            self.frames_rendered, self.frames_dropped, self.controls_skipped
        )
    }
}
