use std::collections::HashMap;

use mdfview_core::geometry::Point2;

use crate::session::ViewerSession;

#[derive(Debug, Clone)]
pub struct CommandRequest {
    pub name: String,
    pub args: Vec<String>,
}

impl CommandRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// 解析形如 `pan 10 -5` 的文本命令。
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let name = parts.next()?.to_string();
        Some(Self {
            name,
            args: parts.map(str::to_string).collect(),
        })
    }

    fn number_arg(&self, index: usize) -> Result<f64, CommandResponse> {
        let raw = self
            .args
            .get(index)
            .ok_or_else(|| CommandResponse::err(format!("{} 缺少第 {} 个参数", self.name, index + 1)))?;
        raw.parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .ok_or_else(|| CommandResponse::err(format!("{} 的参数 \"{raw}\" 不是数值", self.name)))
    }
}

#[derive(Debug, Clone)]
pub struct CommandResponse {
    pub success: bool,
    pub message: Option<String>,
}

impl CommandResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

pub trait CommandHandler: Send + Sync {
    fn name(&self) -> &'static str;
    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse;
}

pub struct CommandContext<'a> {
    pub session: &'a mut ViewerSession,
}

pub struct CommandBus {
    handlers: HashMap<&'static str, Box<dyn CommandHandler>>,
}

impl Default for CommandBus {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandBus {
    pub fn new() -> Self {
        let mut bus = Self {
            handlers: HashMap::new(),
        };
        bus.register(ZoomInCommand);
        bus.register(ZoomOutCommand);
        bus.register(WheelCommand);
        bus.register(PanCommand);
        bus.register(ResetViewCommand);
        bus.register(ViewStatusCommand);
        bus
    }

    pub fn register<H: CommandHandler + 'static>(&mut self, handler: H) {
        self.handlers.insert(handler.name(), Box::new(handler));
    }

    pub fn dispatch(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        if let Some(handler) = self.handlers.get(request.name.as_str()) {
            handler.execute(request, context)
        } else {
            CommandResponse::err(format!("未知命令: {}", request.name))
        }
    }

    pub fn available_commands(&self) -> impl Iterator<Item = &&'static str> {
        self.handlers.keys()
    }
}

fn zoom_message(session: &ViewerSession) -> String {
    format!("缩放={:.3}", session.display().zoom())
}

struct ZoomInCommand;

impl CommandHandler for ZoomInCommand {
    fn name(&self) -> &'static str {
        "zoom_in"
    }

    fn execute(
        &self,
        _request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        context.session.display_mut().zoom_in();
        CommandResponse::ok(zoom_message(context.session))
    }
}

struct ZoomOutCommand;

impl CommandHandler for ZoomOutCommand {
    fn name(&self) -> &'static str {
        "zoom_out"
    }

    fn execute(
        &self,
        _request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        context.session.display_mut().zoom_out();
        CommandResponse::ok(zoom_message(context.session))
    }
}

/// `wheel <delta_y>`，与浏览器滚轮事件方向一致。
struct WheelCommand;

impl CommandHandler for WheelCommand {
    fn name(&self) -> &'static str {
        "wheel"
    }

    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        let delta = match request.number_arg(0) {
            Ok(delta) => delta,
            Err(response) => return response,
        };
        context.session.display_mut().wheel(delta);
        CommandResponse::ok(zoom_message(context.session))
    }
}

/// `pan <dx> <dy>`：模拟一次完整的拖拽手势。
struct PanCommand;

impl CommandHandler for PanCommand {
    fn name(&self) -> &'static str {
        "pan"
    }

    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        let (dx, dy) = match (request.number_arg(0), request.number_arg(1)) {
            (Ok(dx), Ok(dy)) => (dx, dy),
            (Err(response), _) | (_, Err(response)) => return response,
        };
        let display = context.session.display_mut();
        display.begin_drag(Point2::new(0.0, 0.0));
        display.drag_to(Point2::new(dx, dy));
        display.end_drag();
        let pan = display.pan();
        CommandResponse::ok(format!("平移=({:.2}, {:.2})", pan.x(), pan.y()))
    }
}

struct ResetViewCommand;

impl CommandHandler for ResetViewCommand {
    fn name(&self) -> &'static str {
        "reset_view"
    }

    fn execute(
        &self,
        _request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        context.session.display_mut().reset();
        CommandResponse::ok("视图已重置")
    }
}

struct ViewStatusCommand;

impl CommandHandler for ViewStatusCommand {
    fn name(&self) -> &'static str {
        "view_status"
    }

    fn execute(
        &self,
        _request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        let display = context.session.display();
        CommandResponse::ok(format!(
            "缩放={:.3}, 平移=({:.2}, {:.2})",
            display.zoom(),
            display.pan().x(),
            display.pan().y()
        ))
    }
}
