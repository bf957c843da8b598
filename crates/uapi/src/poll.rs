//! poll 事件位

use bitflags::bitflags;

bitflags! {
    /// poll(2) 事件掩码
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PollEvents: u16 {
        const POLLIN = 0x001;
        const POLLPRI = 0x002;
        const POLLOUT = 0x004;
        const POLLERR = 0x008;
        const POLLHUP = 0x010;
        const POLLNVAL = 0x020;
        const POLLRDNORM = 0x040;
    }
}
