//! Host-side test harness
//!
//! Runs user processes as host threads against a shared kernel: a thread
//! spawner standing in for process creation, a capturing console, a power
//! flag, and helpers to lay out syscall frames in user memory.

use std::collections::{BTreeMap, VecDeque};
use std::string::{String, ToString};
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::thread::{self, JoinHandle};
use std::vec::Vec;

use crate::config::abi::WORD_SIZE;
use crate::config::regions::USER_STACK_TOP;
use crate::drivers::{Console, Power};
use crate::fs::{FsLock, RamFs};
use crate::fs::ramfs::RamFile;
use crate::mm::{AddressSpace, PageTable, PteFlags, VirtAddr, PAGE_SIZE};
use crate::process::{program_name, ParentLink, Pid, Process, Spawner};
use crate::syscall::numbers::SYS_EXIT;
use crate::syscall::Kernel;
use crate::trap::{handle_syscall, Disposition, TrapFrame};

/// Read-only code page.
pub const CODE_BASE: usize = 0x0804_8000;
/// First read/write data page.
pub const DATA_BASE: usize = 0x0805_0000;
pub const DATA_PAGES: usize = 4;
/// The single mapped stack page, just below the user/kernel split.
pub const STACK_PAGE: usize = USER_STACK_TOP - PAGE_SIZE;
/// Value placed in `eax` before each trap to detect untouched slots.
pub const EAX_POISON: u32 = 0xdead_beef;

pub type Program = Arc<dyn Fn(&mut UserProc) + Send + Sync>;

pub struct CaptureConsole {
    out: Mutex<Vec<u8>>,
    input: Mutex<VecDeque<u8>>,
    fs: Arc<FsLock<RamFs>>,
    saw_locked: AtomicBool,
}

impl CaptureConsole {
    fn new(fs: Arc<FsLock<RamFs>>) -> Self {
        Self {
            out: Mutex::new(Vec::new()),
            input: Mutex::new(VecDeque::new()),
            fs,
            saw_locked: AtomicBool::new(false),
        }
    }

    pub fn output(&self) -> String {
        String::from_utf8_lossy(&self.out.lock().unwrap()).into_owned()
    }

    pub fn feed(&self, bytes: &[u8]) {
        self.input.lock().unwrap().extend(bytes.iter().copied());
    }

    /// Whether any console access happened with the filesystem lock held.
    pub fn saw_fs_locked(&self) -> bool {
        self.saw_locked.load(Ordering::SeqCst)
    }

    fn note_lock(&self) {
        if self.fs.is_locked() {
            self.saw_locked.store(true, Ordering::SeqCst);
        }
    }
}

impl Console for CaptureConsole {
    fn put_bytes(&self, bytes: &[u8]) {
        self.note_lock();
        self.out.lock().unwrap().extend_from_slice(bytes);
    }

    fn get_byte(&self) -> u8 {
        self.note_lock();
        self.input.lock().unwrap().pop_front().unwrap_or(0)
    }
}

#[derive(Default)]
pub struct PowerFlag {
    off: AtomicBool,
}

impl PowerFlag {
    pub fn is_off(&self) -> bool {
        self.off.load(Ordering::SeqCst)
    }
}

impl Power for PowerFlag {
    fn power_off(&self) {
        self.off.store(true, Ordering::SeqCst);
    }
}

/// A latch test threads can block on.
#[derive(Default)]
pub struct Gate {
    open: AtomicBool,
}

impl Gate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&self) {
        self.open.store(true, Ordering::SeqCst);
    }

    pub fn wait(&self) {
        while !self.open.load(Ordering::SeqCst) {
            thread::yield_now();
        }
    }
}

/// Process creation backed by host threads. Unknown programs fail to load.
pub struct ThreadSpawner {
    kernel: Weak<Kernel<RamFs>>,
    programs: Mutex<BTreeMap<String, Program>>,
    next_pid: AtomicI32,
    last: Mutex<Option<i32>>,
    threads: Mutex<Vec<JoinHandle<()>>>,
    pub refuse: AtomicBool,
}

impl ThreadSpawner {
    fn new(kernel: Weak<Kernel<RamFs>>) -> Self {
        Self {
            kernel,
            programs: Mutex::new(BTreeMap::new()),
            next_pid: AtomicI32::new(2),
            last: Mutex::new(None),
            threads: Mutex::new(Vec::new()),
            refuse: AtomicBool::new(false),
        }
    }

    /// Pid handed out by the most recent spawn.
    pub fn last_pid(&self) -> Option<i32> {
        *self.last.lock().unwrap()
    }
}

impl Spawner for ThreadSpawner {
    fn spawn(&self, cmdline: &str, parent: ParentLink) -> Option<Pid> {
        if self.refuse.load(Ordering::SeqCst) {
            return None;
        }
        let kernel = self.kernel.upgrade()?;
        let pid = Pid::new(self.next_pid.fetch_add(1, Ordering::SeqCst));
        *self.last.lock().unwrap() = Some(pid.as_raw());

        let program = self.programs.lock().unwrap().get(program_name(cmdline)).cloned();
        let cmdline = cmdline.to_string();
        let handle = thread::spawn(move || {
            let mut up = UserProc::new(kernel, pid, &cmdline, Some(parent));
            let loaded = program.is_some();
            if let Some(link) = up.proc.parent() {
                link.report_load(loaded);
            }
            match program {
                Some(program) => {
                    program(&mut up);
                    if !up.proc.has_exited() {
                        up.exit(0);
                    }
                }
                None => {
                    up.kernel.terminate(&mut up.proc, -1);
                }
            }
        });
        self.threads.lock().unwrap().push(handle);
        Some(pid)
    }
}

pub struct Harness {
    pub kernel: Arc<Kernel<RamFs>>,
    pub fs: Arc<FsLock<RamFs>>,
    pub console: Arc<CaptureConsole>,
    pub power: Arc<PowerFlag>,
    pub spawner: Arc<ThreadSpawner>,
}

impl Harness {
    pub fn new() -> Self {
        let fs = Arc::new(FsLock::new(RamFs::new()));
        let console = Arc::new(CaptureConsole::new(fs.clone()));
        let power = Arc::new(PowerFlag::default());

        let mut spawner = None;
        let kernel = Arc::new_cyclic(|weak| {
            let s = Arc::new(ThreadSpawner::new(weak.clone()));
            spawner = Some(s.clone());
            Kernel::new(fs.clone(), console.clone(), s, power.clone())
        });
        let spawner = spawner.expect("spawner built with kernel");

        Self {
            kernel,
            fs,
            console,
            power,
            spawner,
        }
    }

    /// Register a program that `exec` can start by name.
    pub fn program(&self, name: &str, body: impl Fn(&mut UserProc) + Send + Sync + 'static) {
        self.spawner
            .programs
            .lock()
            .unwrap()
            .insert(name.to_string(), Arc::new(body));
    }

    /// A parentless process with pid 1.
    pub fn process(&self, cmdline: &str) -> UserProc {
        UserProc::new(self.kernel.clone(), Pid::new(1), cmdline, None)
    }

    /// Join every spawned thread, including ones spawned while joining.
    pub fn join_children(&self) {
        loop {
            let Some(handle) = self.spawner.threads.lock().unwrap().pop() else {
                return;
            };
            handle.join().expect("child thread panicked");
        }
    }
}

/// A user process plus helpers for placing data and issuing traps.
pub struct UserProc {
    pub kernel: Arc<Kernel<RamFs>>,
    pub proc: Process<RamFile>,
    brk: usize,
}

impl UserProc {
    fn new(kernel: Arc<Kernel<RamFs>>, pid: Pid, cmdline: &str, parent: Option<ParentLink>) -> Self {
        let mut pt = PageTable::new();
        pt.map(VirtAddr::new(CODE_BASE), PteFlags::USER_RO).unwrap();
        pt.map_range(VirtAddr::new(DATA_BASE), DATA_PAGES * PAGE_SIZE, PteFlags::USER_RW)
            .unwrap();
        pt.map(VirtAddr::new(STACK_PAGE), PteFlags::USER_RW).unwrap();
        Self {
            kernel,
            proc: Process::new(pid, cmdline, std::boxed::Box::new(pt), parent),
            brk: DATA_BASE,
        }
    }

    /// Write raw bytes at `va`.
    pub fn poke(&mut self, va: VirtAddr, bytes: &[u8]) {
        self.proc.address_space_mut().write_bytes(va, bytes).unwrap();
    }

    /// Read `n` bytes at user address `addr`.
    pub fn peek(&self, addr: u32, n: usize) -> Vec<u8> {
        let mut buf = std::vec![0; n];
        self.proc
            .address_space()
            .read_bytes(VirtAddr::from(addr), &mut buf)
            .unwrap();
        buf
    }

    /// Reserve `n` zeroed bytes in the data region.
    pub fn alloc(&mut self, n: usize) -> u32 {
        let addr = self.brk;
        self.brk += n;
        assert!(self.brk <= DATA_BASE + DATA_PAGES * PAGE_SIZE, "data region full");
        addr as u32
    }

    /// Copy `bytes` into the data region.
    pub fn put(&mut self, bytes: &[u8]) -> u32 {
        let addr = self.alloc(bytes.len());
        self.poke(VirtAddr::from(addr), bytes);
        addr
    }

    /// Copy a NUL-terminated string into the data region.
    pub fn put_str(&mut self, s: &str) -> u32 {
        let mut bytes = s.as_bytes().to_vec();
        bytes.push(0);
        self.put(&bytes)
    }

    /// Lay out a call frame on the stack page and return its address.
    pub fn push_frame(&mut self, nr: u32, args: &[u32]) -> VirtAddr {
        let esp = VirtAddr::new(STACK_PAGE + PAGE_SIZE - 16 * WORD_SIZE);
        let mut words = std::vec![nr];
        words.extend_from_slice(args);
        let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
        self.poke(esp, &bytes);
        esp
    }

    /// Trap into the kernel. Returns the disposition and the final `eax`.
    pub fn call(&mut self, nr: u32, args: &[u32]) -> (Disposition, i32) {
        let esp = self.push_frame(nr, args);
        let mut frame = TrapFrame {
            esp: esp.as_usize() as u32,
            eax: EAX_POISON,
        };
        let d = handle_syscall(&self.kernel, &mut self.proc, &mut frame);
        (d, frame.eax as i32)
    }

    /// Trap for a value-returning call that must not kill the process.
    pub fn sys(&mut self, nr: u32, args: &[u32]) -> i32 {
        let (d, eax) = self.call(nr, args);
        assert_eq!(d, Disposition::Resume, "call {} ended the process", nr);
        eax
    }

    /// Trap for a void call that must not kill the process.
    pub fn sys_void(&mut self, nr: u32, args: &[u32]) {
        let (d, eax) = self.call(nr, args);
        assert_eq!(d, Disposition::Resume, "call {} ended the process", nr);
        assert_eq!(eax as u32, EAX_POISON, "void call {} wrote eax", nr);
    }

    pub fn exit(&mut self, status: i32) {
        let (d, _) = self.call(SYS_EXIT, &[status as u32]);
        assert!(matches!(d, Disposition::Exited(_)));
    }
}
