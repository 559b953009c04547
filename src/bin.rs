#![no_main]
#![no_std]

use core::{
    convert::Infallible,
    sync::atomic::{AtomicUsize, Ordering},
};
use defmt::{debug, info, trace, warn};
use defmt_brtt as _; // global logger
use nmea_dispatch::{
    nmea::GsvFlush, ByteSource, Config, Gps, Position, Sentence, SentenceKind, SentenceSink,
};
use panic_probe as _;
use rtic_sync::{
    channel::{Receiver, Sender},
    make_channel,
};
use stm32l4xx_hal::{
    gpio::{Alternate, PushPull, PA10, PA9},
    pac::USART1,
    prelude::*,
    serial::{self, Serial},
};

// same panicking *behavior* as `panic-probe` but doesn't print a panic message
// this prevents the panic message being printed *twice* when `defmt::panic` is invoked
#[defmt::panic_handler]
fn panic() -> ! {
    cortex_m::asm::udf()
}

static COUNT: AtomicUsize = AtomicUsize::new(0);
defmt::timestamp!("{=usize}", {
    // NOTE(no-CAS) `timestamps` runs with interrupts disabled
    let n = COUNT.load(Ordering::Relaxed);
    COUNT.store(n + 1, Ordering::Relaxed);
    n
});

type GpsUart = Serial<USART1, (PA9<Alternate<PushPull, 7>>, PA10<Alternate<PushPull, 7>>)>;

const POSITION_QUEUE: usize = 4;

/// The receiver's UART, one RXNE interrupt per byte.
struct UartSource(GpsUart);

impl ByteSource for UartSource {
    type Error = Infallible;

    fn request_next_byte(&mut self) -> Result<(), Infallible> {
        self.0.listen(serial::Event::Rxne);
        Ok(())
    }

    fn stop_receiving(&mut self) {
        self.0.unlisten(serial::Event::Rxne);
    }
}

/// Forwards fixes out of the interrupt to the reporting task.
struct PositionSink(Sender<'static, Position, POSITION_QUEUE>);

impl SentenceSink for PositionSink {
    fn handle(&mut self, sentence: &Sentence) {
        let position = match sentence {
            Sentence::Gga(gga) if gga.has_fix() => gga.position(),
            Sentence::Rmc(rmc) if rmc.is_valid() => rmc.position(),
            Sentence::Gsv(gsv) => {
                trace!("GSV {} of {}: {} in view", gsv.msg_no, gsv.num_msg, gsv.num_sv);
                return;
            }
            _ => return,
        };
        // Reporter is behind, drop the fix
        if self.0.try_send(position).is_err() {
            debug!("position queue full");
        }
    }
}

type GpsReceiver = Gps<UartSource, PositionSink>;

#[rtic::app(
    device = stm32l4xx_hal::pac,
    dispatchers = [EXTI0],
)]
mod app {
    use super::*;

    #[shared]
    struct Shared {}

    #[local]
    struct Local {
        gps: GpsReceiver,
    }

    #[init]
    fn init(cx: init::Context) -> (Shared, Local) {
        trace!("init enter");

        let mut flash = cx.device.FLASH.constrain();
        let mut rcc = cx.device.RCC.constrain();
        let mut pwr = cx.device.PWR.constrain(&mut rcc.apb1r1);
        let clocks = rcc.cfgr.freeze(&mut flash.acr, &mut pwr);

        let mut gpioa = cx.device.GPIOA.split(&mut rcc.ahb2);

        // Initialize UART for GPS
        let tx = gpioa
            .pa9
            .into_alternate(&mut gpioa.moder, &mut gpioa.otyper, &mut gpioa.afrh);
        let rx = gpioa
            .pa10
            .into_alternate(&mut gpioa.moder, &mut gpioa.otyper, &mut gpioa.afrh);
        let uart = Serial::usart1(
            cx.device.USART1,
            (tx, rx),
            serial::Config::default().baudrate(9600.bps()),
            clocks,
            &mut rcc.apb2,
        );

        let (position_tx, position_rx) = make_channel!(Position, POSITION_QUEUE);

        let config = Config {
            verify_checksum: true,
            gsv_flush: GsvFlush::OnCompletion,
            ..Default::default()
        };
        let mut gps = Gps::with_config(UartSource(uart), PositionSink(position_tx), config);
        for kind in [SentenceKind::Gga, SentenceKind::Rmc, SentenceKind::Gsv] {
            if let Err(e) = gps.enable(kind) {
                warn!("could not enable {}: {}", kind.name(), e);
            }
        }

        report_task::spawn(position_rx).map_err(|_| ()).unwrap();

        info!("done initializing!");
        trace!("init exit");
        (Shared {}, Local { gps })
    }

    #[idle]
    fn idle(_: idle::Context) -> ! {
        trace!("idle enter");

        loop {
            // Only sleep in release mode, since the debugger doesn't interact with sleep very nicely
            #[cfg(debug_assertions)]
            cortex_m::asm::nop();
            #[cfg(not(debug_assertions))]
            cortex_m::asm::wfi();
        }
    }

    #[task(binds = USART1, priority = 10, local = [gps])]
    fn on_uart(cx: on_uart::Context) {
        let gps = cx.local.gps;
        match gps.source_mut().0.read() {
            Ok(b) => {
                if let Err(e) = gps.on_byte_received(b) {
                    warn!("{}", e);
                }
            }
            Err(nb::Error::WouldBlock) => (),
            // Overrun and framing errors lose the byte, the framer resyncs on the next line
            Err(nb::Error::Other(e)) => debug!("uart error {}", defmt::Debug2Format(&e)),
        }
    }

    #[task(priority = 1)]
    async fn report_task(
        _cx: report_task::Context,
        mut positions: Receiver<'static, Position, POSITION_QUEUE>,
    ) {
        while let Ok(position) = positions.recv().await {
            info!("fix: {}", position);
        }
    }
}
