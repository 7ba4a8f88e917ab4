use std::fmt;

use colored::Colorize;

use crate::conv::{
    Convergence,
    Criterion,
    StepConvergence,
};


pub struct ConvergenceFormat<'a> {
    _data            : &'a [StepConvergence],
    _criterion       : Option<Criterion>,
    _de              : Vec<f64>,

    print_energy     : bool,
    print_toten      : bool,
    print_de         : bool,
    print_fmax       : bool,
    print_fmax_index : bool,
    print_favg       : bool,
    print_nscf       : bool,
}


impl<'a> ConvergenceFormat<'a> {
    /// Format the last `last_n` steps, all steps if `last_n` is 0.
    pub fn from_convergence(conv: &'a Convergence, last_n: usize) -> Self {
        let data = conv.tail(last_n);
        let skip = conv.steps.len() - data.len();
        Self {
            _data            : data,
            _criterion       : conv.criterion,
            _de              : conv.energy_changes()[skip..].to_vec(),
            print_energy     : true,
            print_toten      : false,
            print_de         : true,
            print_fmax       : true,
            print_fmax_index : true,
            print_favg       : true,
            print_nscf       : true,
        }
    }
}


macro_rules! impl_builder_item {
    ($t: tt) => {
        pub fn $t(mut self, arg: bool) -> Self {
            self.$t = arg;
            self
        }
    };
}


// Use consuming builder pattern
impl ConvergenceFormat<'_> {
    impl_builder_item!(print_energy);
    impl_builder_item!(print_toten);
    impl_builder_item!(print_de);
    impl_builder_item!(print_fmax);
    impl_builder_item!(print_fmax_index);
    impl_builder_item!(print_favg);
    impl_builder_item!(print_nscf);
}


impl fmt::Display for ConvergenceFormat<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut header = format!("{:>5}", "#Step");
        if self.print_energy     { header += &format!(" {:>13}", "E0(eV)"); }
        if self.print_toten      { header += &format!(" {:>13}", "TOTEN(eV)"); }
        if self.print_de         { header += &format!(" {:>10}", "dE(eV)"); }
        if self.print_fmax       { header += &format!(" {:>9}", "Fmax"); }
        if self.print_fmax_index { header += &format!(" {:>5}", "Atom"); }
        if self.print_favg       { header += &format!(" {:>9}", "Favg"); }
        if self.print_nscf       { header += &format!(" {:>4}", "SCF"); }
        writeln!(f, "{}", header.bright_green())?;

        for (it, de) in self._data.iter().zip(self._de.iter()) {
            let mut line = format!("{:5}", it.step);

            if self.print_energy { line += &format!(" {:13.6}", it.energy); }
            if self.print_toten  { line += &format!(" {:13.6}", it.toten); }
            if self.print_de     { line += &format!(" {:10.2e}", de); }

            if self.print_fmax {
                let s = format!(" {:9.5}", it.fmax);
                match self._criterion {
                    Some(Criterion::Force(c)) if it.fmax < c => line += &s.bright_green().to_string(),
                    Some(Criterion::Force(_)) => line += &s.bright_red().to_string(),
                    _ => line += &s,
                }
            }

            if self.print_fmax_index { line += &format!(" {:5}", it.fmax_index); }
            if self.print_favg       { line += &format!(" {:9.5}", it.favg); }
            if self.print_nscf       { line += &format!(" {:4}", it.nscf); }

            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}
