//! Well-known AMS ports and ADS index groups.

/// AMS port of the system service (TwinCAT state, routes, registry).
pub const PORT_SYSTEM_SERVICE: u16 = 10000;
/// AMS port of the first TwinCAT 3 PLC runtime.
pub const PORT_PLC_RUNTIME_TC3: u16 = 851;
/// AMS port of the first TwinCAT 2 PLC runtime.
pub const PORT_PLC_RUNTIME_TC2: u16 = 801;

/// PLC memory area (%M).
pub const PLC_RW_M: u32 = 0x4020;
/// PLC data area.
pub const PLC_RW_DB: u32 = 0x4040;

/// Acquire a handle for a symbol name (ReadWrite, name in, handle out).
pub const GET_SYMHANDLE_BYNAME: u32 = 0xF003;
/// Read or write a value through a handle (handle in the index offset).
pub const RW_SYMVAL_BYHANDLE: u32 = 0xF005;
/// Release a handle (Write, handle as data).
pub const RELEASE_SYMHANDLE: u32 = 0xF006;
/// Symbol entry for a name (ReadWrite, name in, entry out).
pub const GET_SYMINFO_BYNAME_EX: u32 = 0xF009;
/// Symbol and data type counts and upload sizes.
pub const SYM_UPLOAD_INFO2: u32 = 0xF00F;
/// Data type entry for a type name (ReadWrite, name in, entry out).
pub const GET_DATATYPE_BYNAME_EX: u32 = 0xF011;

/// Read length that lets the device choose the reply size.
pub const READ_LENGTH_ANY: u32 = 0xFFFF_FFFF;
