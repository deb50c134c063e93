pub mod configuration;
pub mod readererror;

pub mod math {
    pub mod statistics;

    pub mod curve {
        pub mod curve;
        pub mod curveinverter;
        pub mod nonparametriccurve {
            pub mod nonparametriccurve;
            pub mod piecewiseconstant;
            pub mod piecewisepolynomial;
        }
    }
}

pub mod plot {
    pub mod subplotgrid;
    pub mod phaseportrait;
}

pub mod solution {
    pub mod exportfile;
    pub mod sampledseries;
    pub mod variable;
    pub mod variablebunch;
    pub mod solutiontable;
    pub mod bocopsolution;
}
